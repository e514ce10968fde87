//! The batch orchestrator: `process(files, max_threads)`.
//!
//! Preprocessing (load, scan, page) and page matching both run on the
//! worker pool; a pending-unit counter tracks every outstanding page plus
//! one reserved unit per in-flight writeback, so the calling thread's wait
//! unblocks only once every file's writeback has actually completed —
//! resolving the open question in favor of "join writeback before
//! returning" so a caller never sees `ok: true` for a file whose write
//! failed.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rewrite_core::config::EngineConfig;
use rewrite_core::{EngineError, FileContent, Page, ProcessingResult, ProtectedRegionSpec, ReplacementMap, WritebackNotification};
use rewrite_match::Matcher;
use rewrite_scan::{paginate, scan_protected_intervals};

use crate::loader::load_text_file;
use crate::pool::WorkerPool;
use crate::writeback::{WritebackOutcome, WritebackPipeline};

/// Batch-level summary returned alongside the per-file `ProcessingResult`s.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub files_total: usize,
    pub files_changed: usize,
    pub files_failed: usize,
    pub replacements_total: usize,
    pub elapsed: Duration,
}

/// Runs one batch: loads every file in `files`, scans protected regions,
/// pages, applies `rules`, and writes changed files back to disk.
///
/// `max_threads == 0` means auto-size: `min(files.len() * 2, H)`, where
/// `H = hardware_concurrency * 1.5`; otherwise `min(max_threads, H)`,
/// clamped to at least 1. Results are returned in `files` order.
pub fn run_batch(
    files: &[PathBuf],
    rules: &ReplacementMap,
    protections: &[ProtectedRegionSpec],
    config: &EngineConfig,
) -> (Vec<ProcessingResult>, EngineStats) {
    let started = Instant::now();

    if files.is_empty() {
        return (
            Vec::new(),
            EngineStats { files_total: 0, files_changed: 0, files_failed: 0, replacements_total: 0, elapsed: started.elapsed() },
        );
    }

    let thread_count = effective_thread_count(files.len(), config.effective_max_threads());
    tracing::info!(files = files.len(), threads = thread_count, "starting batch");

    let pool = Arc::new(WorkerPool::new(thread_count));
    let matcher = Arc::new(Matcher::build(rules));
    let protections = Arc::new(protections.to_vec());

    let results: Arc<Mutex<Vec<Option<ProcessingResult>>>> = Arc::new(Mutex::new(vec![None; files.len()]));
    let pending = Arc::new(AtomicUsize::new(files.len()));
    let signal = Arc::new(BatchSignal::new());

    let (outcomes_tx, outcomes_rx) = mpsc::channel::<WritebackOutcome>();
    let pipeline = Arc::new(WritebackPipeline::new(Arc::clone(&pool), outcomes_tx));

    let merge_handle = spawn_outcome_merger(outcomes_rx, Arc::clone(&results), Arc::clone(&pending), Arc::clone(&signal));

    for (idx, path) in files.iter().enumerate() {
        submit_preprocess(
            idx,
            path.clone(),
            config.clone(),
            Arc::clone(&protections),
            Arc::clone(&matcher),
            Arc::clone(&pool),
            Arc::clone(&pipeline),
            Arc::clone(&results),
            Arc::clone(&pending),
            Arc::clone(&signal),
        );
    }

    signal.wait_until_done();

    // Stop the writeback dispatcher first so it finishes draining queued
    // writes, then the worker pool.
    pipeline.shutdown();
    pool.shutdown();
    let _ = merge_handle.join();

    let results: Vec<ProcessingResult> = Arc::try_unwrap(results)
        .unwrap_or_else(|arc| Mutex::new(arc.lock().unwrap().clone()))
        .into_inner()
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.unwrap_or_else(|| panic!("file at index {i} never produced a result")))
        .collect();

    let files_changed = results.iter().filter(|r| r.ok && r.replacement_count > 0).count();
    let files_failed = results.iter().filter(|r| !r.ok).count();
    let replacements_total = results.iter().map(|r| r.replacement_count).sum();

    tracing::info!(files_changed, files_failed, replacements_total, "batch complete");

    let stats = EngineStats {
        files_total: files.len(),
        files_changed,
        files_failed,
        replacements_total,
        elapsed: started.elapsed(),
    };
    (results, stats)
}

fn effective_thread_count(file_count: usize, max_threads: usize) -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let hardware_ceiling = ((available as f64) * 1.5) as usize;
    let hardware_ceiling = hardware_ceiling.max(1);
    let sized = if max_threads == 0 { (file_count * 2).min(hardware_ceiling) } else { max_threads.min(hardware_ceiling) };
    sized.max(1)
}

#[allow(clippy::too_many_arguments)]
fn submit_preprocess(
    idx: usize,
    path: PathBuf,
    config: EngineConfig,
    protections: Arc<Vec<ProtectedRegionSpec>>,
    matcher: Arc<Matcher>,
    pool: Arc<WorkerPool>,
    pipeline: Arc<WritebackPipeline>,
    results: Arc<Mutex<Vec<Option<ProcessingResult>>>>,
    pending: Arc<AtomicUsize>,
    signal: Arc<BatchSignal>,
) {
    let producer = {
        let path = path.clone();
        move || preprocess(&path, &config, &protections)
    };
    let submit_failed_path = path.clone();
    let page_pool = Arc::clone(&pool);

    let continuation = move |prep: Result<(Arc<FileContent>, Vec<Page>), rewrite_core::errors::LoadError>| match prep {
        Err(load_err) => {
            tracing::warn!(path = %path.display(), error = %load_err, "failed to load file");
            results.lock().unwrap()[idx] = Some(ProcessingResult::failure(path, load_err.caller_message()));
            signal.note_progress(&pending);
        }
        Ok((file, pages)) => {
            if pages.is_empty() {
                results.lock().unwrap()[idx] = Some(ProcessingResult::success(file.path.clone(), 0));
                signal.note_progress(&pending);
                return;
            }

            pending.fetch_add(pages.len(), Ordering::AcqRel);
            let page_errors = Arc::new(Mutex::new(vec![None; pages.len()]));

            for page in pages {
                let file = Arc::clone(&file);
                let matcher = Arc::clone(&matcher);
                let page_errors = Arc::clone(&page_errors);
                let pending = Arc::clone(&pending);
                let signal = Arc::clone(&signal);
                let results = Arc::clone(&results);
                let pipeline = Arc::clone(&pipeline);
                if page_pool
                    .submit(move || process_page(file, page, matcher, page_errors, pending, signal, results, pipeline, idx))
                    .is_err()
                {
                    tracing::error!("failed to submit page task: pool already shut down");
                }
            }
        }
    };

    if pool.submit_with_callback(producer, continuation).is_err() {
        tracing::error!(path = %submit_failed_path.display(), "failed to submit preprocess task: pool already shut down");
    }
}

fn preprocess(path: &Path, config: &EngineConfig, protections: &[ProtectedRegionSpec]) -> Result<(Arc<FileContent>, Vec<Page>), rewrite_core::errors::LoadError> {
    let content = load_text_file(path, config)?;
    let intervals = scan_protected_intervals(&content, protections);
    let pages = paginate(&content, &intervals, config.effective_page_size());
    let file = Arc::new(FileContent::new(path.to_path_buf(), content, intervals, pages.len()));
    Ok((file, pages))
}

#[allow(clippy::too_many_arguments)]
fn process_page(
    file: Arc<FileContent>,
    page: Page,
    matcher: Arc<Matcher>,
    page_errors: Arc<Mutex<Vec<Option<String>>>>,
    pending: Arc<AtomicUsize>,
    signal: Arc<BatchSignal>,
    results: Arc<Mutex<Vec<Option<ProcessingResult>>>>,
    pipeline: Arc<WritebackPipeline>,
    idx: usize,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let slice = &file.content[page.start_pos..page.end_pos];
        if page.is_protected {
            (slice.to_vec(), 0usize)
        } else {
            matcher.apply(slice)
        }
    }));

    match outcome {
        Ok((processed, count)) => {
            file.add_replacements(count);
            file.set_processed_page(page.id, processed);
        }
        Err(payload) => {
            let err = EngineError::PageProcessingError(panic_payload_message(&payload));
            tracing::warn!(path = %file.path.display(), page_id = page.id, error = %err, "page processing failed");
            page_errors.lock().unwrap()[page.id] = Some(err.to_string());
            // Every slot must be filled for `concat_processed_pages` to stay
            // safe to call; the fallback is never written to disk because a
            // page error skips writeback below.
            let fallback = file.content[page.start_pos..page.end_pos].to_vec();
            file.set_processed_page(page.id, fallback);
        }
    }

    let is_last_page = file.complete_one_page();
    signal.note_progress(&pending);

    if is_last_page {
        let joined_error = {
            let errors = page_errors.lock().unwrap();
            join_page_errors(&errors)
        };
        match joined_error {
            Some(message) => {
                results.lock().unwrap()[idx] = Some(ProcessingResult::failure(file.path.clone(), message));
                // No writeback will happen for this file; release its
                // reserved pending unit directly.
                signal.note_progress(&pending);
            }
            None => pipeline.enqueue(WritebackNotification { file, idx }),
        }
    }
}

fn join_page_errors(errors: &[Option<String>]) -> Option<String> {
    let messages: Vec<&str> = errors.iter().filter_map(|e| e.as_deref()).collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

fn panic_payload_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn spawn_outcome_merger(
    outcomes_rx: mpsc::Receiver<WritebackOutcome>,
    results: Arc<Mutex<Vec<Option<ProcessingResult>>>>,
    pending: Arc<AtomicUsize>,
    signal: Arc<BatchSignal>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("rewrite-outcome-merge".to_string())
        .spawn(move || {
            while let Ok(outcome) = outcomes_rx.recv() {
                let result = if outcome.ok {
                    ProcessingResult::success(outcome.file_path, outcome.replacement_count)
                } else {
                    ProcessingResult::failure(outcome.file_path, outcome.err_msg.unwrap_or_default())
                };
                results.lock().unwrap()[outcome.idx] = Some(result);
                signal.note_progress(&pending);
            }
        })
        .expect("failed to spawn outcome-merge thread")
}

/// Signals batch completion: the pending-unit counter transitioning to
/// zero. One unit per outstanding page, plus one reserved per file whose
/// pages all completed but whose writeback (or writeback-skip-on-error)
/// hasn't been observed yet.
struct BatchSignal {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl BatchSignal {
    fn new() -> Self {
        Self { done: Mutex::new(false), condvar: Condvar::new() }
    }

    fn note_progress(&self, pending: &AtomicUsize) {
        if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let mut done = self.done.lock().unwrap();
            *done = true;
            self.condvar.notify_all();
        }
    }

    fn wait_until_done(&self) {
        let mut done = self.done.lock().unwrap();
        while !*done {
            done = self.condvar.wait(done).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewrite_core::ReplacementMap;
    use std::fs;

    fn rules(pairs: &[(&str, &str)]) -> ReplacementMap {
        ReplacementMap::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn s1_basic_replace_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.txt");
        fs::write(&path, "hello, world.").unwrap();
        let rules = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);
        let (results, stats) = run_batch(&[path.clone()], &rules, &[], &EngineConfig::default());
        assert_eq!(results.len(), 1);
        assert!(results[0].ok);
        assert_eq!(results[0].replacement_count, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\u{ff0c} world\u{3002}");
        assert_eq!(stats.files_changed, 1);
        assert_eq!(stats.files_failed, 0);
    }

    #[test]
    fn s3_protected_span_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3.txt");
        fs::write(&path, "a, b `c, d` e.").unwrap();
        let rules = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);
        let protections = vec![ProtectedRegionSpec::new("`", "`")];
        let (results, _) = run_batch(&[path.clone()], &rules, &protections, &EngineConfig::default());
        assert!(results[0].ok);
        assert_eq!(results[0].replacement_count, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\u{ff0c} b `c, d` e\u{3002}");
    }

    #[test]
    fn s6_binary_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s6.bin");
        let mut bytes = vec![0u8; 32];
        bytes.extend_from_slice(b"rest");
        fs::write(&path, &bytes).unwrap();
        let rules = rules(&[(",", "\u{ff0c}")]);
        let (results, stats) = run_batch(&[path.clone()], &rules, &[], &EngineConfig::default());
        assert!(!results[0].ok);
        assert_eq!(fs::read(&path).unwrap(), bytes);
        assert_eq!(stats.files_failed, 1);
    }

    #[test]
    fn s7_zero_replacement_file_is_left_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s7.txt");
        fs::write(&path, "nothing to change here").unwrap();
        let rules = rules(&[(";", "\u{ff1b}")]);
        let (results, stats) = run_batch(&[path.clone()], &rules, &[], &EngineConfig::default());
        assert!(results[0].ok);
        assert_eq!(results[0].replacement_count, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "nothing to change here");
        assert_eq!(stats.files_changed, 0);
    }

    #[test]
    fn s8_output_is_deterministic_across_thread_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..6 {
            let path = dir.path().join(format!("f{i}.txt"));
            fs::write(&path, format!("line {i}, with punctuation. and more, text.")).unwrap();
            paths.push(path);
        }
        let rules = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);

        let mut config_one = EngineConfig::default();
        config_one.max_threads = Some(1);
        let (one, _) = run_batch(&paths, &rules, &[], &config_one);
        let expected: Vec<String> = paths.iter().map(|p| fs::read_to_string(p).unwrap()).collect();

        for i in 0..paths.len() {
            fs::write(&paths[i], format!("line {i}, with punctuation. and more, text.")).unwrap();
        }
        let mut config_many = EngineConfig::default();
        config_many.max_threads = Some(16);
        let (many, _) = run_batch(&paths, &rules, &[], &config_many);

        assert_eq!(one.len(), many.len());
        for (a, b) in one.iter().zip(many.iter()) {
            assert_eq!(a.replacement_count, b.replacement_count);
        }
        let actual: Vec<String> = paths.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let (results, stats) = run_batch(&[], &ReplacementMap::new(), &[], &EngineConfig::default());
        assert!(results.is_empty());
        assert_eq!(stats.files_total, 0);
    }

    #[test]
    fn duplicate_input_paths_each_get_their_own_result_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.txt");
        fs::write(&path, "hello, world.").unwrap();
        let rules = rules(&[(",", "\u{ff0c}")]);
        let (results, stats) = run_batch(&[path.clone(), path.clone()], &rules, &[], &EngineConfig::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert!(results[1].ok);
        assert_eq!(stats.files_total, 2);
    }
}
