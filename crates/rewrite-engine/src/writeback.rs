//! The writeback pipeline.
//!
//! A dedicated dispatcher thread drains a queue of completed files. When
//! the pool has idle capacity it hands writebacks off to it; otherwise it
//! writes inline on the dispatcher thread itself, so a busy pool never
//! starves writeback progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rewrite_core::{FileContent, WritebackError, WritebackNotification};

use crate::pool::WorkerPool;

/// The observable outcome of writing one file back to disk (or skipping
/// the write because it had zero replacements).
#[derive(Debug, Clone)]
pub struct WritebackOutcome {
    pub idx: usize,
    pub file_path: std::path::PathBuf,
    pub rewritten: bool,
    pub ok: bool,
    pub err_msg: Option<String>,
    pub replacement_count: usize,
}

/// Dequeues completed files and writes changed ones back to disk.
pub struct WritebackPipeline {
    queue_tx: Sender<WritebackNotification>,
    stop: Arc<AtomicBool>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WritebackPipeline {
    /// Spawns the dispatcher thread. `pool` is used both to check idle
    /// capacity and to run batched writeback tasks; `outcomes_tx` receives
    /// one [`WritebackOutcome`] per file written or skipped.
    pub fn new(pool: Arc<WorkerPool>, outcomes_tx: mpsc::Sender<WritebackOutcome>) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("rewrite-writeback".to_string())
                .spawn(move || dispatcher_loop(queue_rx, pool, outcomes_tx, stop))
                .expect("failed to spawn writeback dispatcher thread")
        };
        Self { queue_tx, stop, handle: std::sync::Mutex::new(Some(handle)) }
    }

    /// Enqueues a file whose pages have all completed.
    pub fn enqueue(&self, notification: WritebackNotification) {
        let _ = self.queue_tx.send(notification);
    }

    /// Sets the stop flag and joins the dispatcher thread. The dispatcher
    /// exits once the queue is empty and every writeback it handed to the
    /// pool has reported its outcome. Idempotent, and safe to call through
    /// a shared `Arc<WritebackPipeline>`.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WritebackPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatcher_loop(
    queue_rx: Receiver<WritebackNotification>,
    pool: Arc<WorkerPool>,
    outcomes_tx: mpsc::Sender<WritebackOutcome>,
    stop: Arc<AtomicBool>,
) {
    let pending_submitted = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    loop {
        match queue_rx.recv_timeout(Duration::from_millis(25)) {
            Ok(first) => {
                if pool.has_idle() {
                    let mut batch = vec![first];
                    for _ in 1..pool.idle_count() {
                        match queue_rx.try_recv() {
                            Ok(n) => batch.push(n),
                            Err(_) => break,
                        }
                    }
                    for notification in batch {
                        let idx = notification.idx;
                        let file = Arc::clone(&notification.file);
                        pending_submitted.fetch_add(1, Ordering::SeqCst);
                        let task_outcomes_tx = outcomes_tx.clone();
                        let task_pending_submitted = Arc::clone(&pending_submitted);
                        let submit_file = Arc::clone(&file);
                        let submit_result = pool.submit(move || {
                            let outcome = write_one(idx, &submit_file);
                            let _ = task_outcomes_tx.send(outcome);
                            task_pending_submitted.fetch_sub(1, Ordering::SeqCst);
                        });
                        if submit_result.is_err() {
                            // Pool is gone; fall back to writing inline so
                            // the outcome is never silently dropped.
                            pending_submitted.fetch_sub(1, Ordering::SeqCst);
                            let _ = outcomes_tx.send(write_one(idx, &file));
                        }
                    }
                } else {
                    let _ = outcomes_tx.send(write_one(first.idx, &first.file));
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst)
                    && queue_rx.is_empty()
                    && pending_submitted.load(Ordering::SeqCst) == 0
                {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn write_one(idx: usize, file: &FileContent) -> WritebackOutcome {
    let file_path = file.path.clone();
    let replacement_count = file.total_replacements();
    if replacement_count == 0 {
        return WritebackOutcome { idx, file_path, rewritten: false, ok: true, err_msg: None, replacement_count };
    }

    let text: String = file.concat_processed_pages().into_iter().collect();
    match std::fs::write(&file.path, text) {
        Ok(()) => {
            tracing::debug!(path = %file.path.display(), replacements = replacement_count, "wrote file");
            WritebackOutcome { idx, file_path, rewritten: true, ok: true, err_msg: None, replacement_count }
        }
        Err(e) => {
            let err = WritebackError::IoWriteError { path: file.path.clone(), message: e.to_string() };
            tracing::error!(path = %file.path.display(), error = %err, "writeback failed");
            WritebackOutcome { idx, file_path, rewritten: false, ok: false, err_msg: Some(err.to_string()), replacement_count }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn zero_replacement_file_is_not_rewritten() {
        let file = FileContent::new(PathBuf::from("/nonexistent/zero.txt"), vec!['a'], vec![], 1);
        file.set_processed_page(0, vec!['a']);
        file.complete_one_page();
        let outcome = write_one(0, &file);
        assert!(!outcome.rewritten);
        assert!(outcome.ok);
    }

    #[test]
    fn writeback_pipeline_writes_changed_file_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s7.txt");
        std::fs::write(&path, "original").unwrap();

        let file = Arc::new(FileContent::new(path.clone(), "changed!".chars().collect(), vec![], 1));
        file.set_processed_page(0, "changed!".chars().collect());
        file.add_replacements(1);
        file.complete_one_page();

        let pool = Arc::new(WorkerPool::new(2));
        let (tx, rx) = mpsc::channel();
        let pipeline = WritebackPipeline::new(Arc::clone(&pool), tx);
        pipeline.enqueue(WritebackNotification { file, idx: 3 });
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(outcome.ok);
        assert!(outcome.rewritten);
        assert_eq!(outcome.idx, 3);
        pipeline.shutdown();
        pool.shutdown();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "changed!");
    }
}
