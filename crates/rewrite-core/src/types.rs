//! Shared data contracts.
//!
//! Text is handled as an ordered sequence of Unicode scalar values
//! (`Vec<char>`), not bytes — pattern matching and all offsets in this
//! crate family are scalar-value offsets. `String`s only appear at the
//! I/O boundary (loading from / writing to disk).

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// A single `pattern -> replacement` rule. Both sides are non-empty
/// scalar sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: Vec<char>,
    pub replacement: Vec<char>,
}

/// An unordered mapping of pattern to replacement.
///
/// Patterns are required to be pairwise distinct; construction rejects a
/// duplicate pattern rather than silently dropping one rule. Insertion
/// order is preserved only because it gives deterministic trie-build
/// order for tests — the matcher's longest-match semantics do not depend
/// on it.
#[derive(Debug, Clone, Default)]
pub struct ReplacementMap {
    rules: Vec<Rule>,
}

/// A pattern was empty, a replacement was empty, or a pattern was
/// registered twice.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplacementMapError {
    #[error("pattern must not be empty")]
    EmptyPattern,
    #[error("replacement must not be empty")]
    EmptyReplacement,
    #[error("duplicate pattern: {0:?}")]
    DuplicatePattern(String),
}

impl ReplacementMap {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Inserts a rule, rejecting empty patterns/replacements and duplicate
    /// patterns.
    pub fn insert(&mut self, pattern: Vec<char>, replacement: Vec<char>) -> Result<(), ReplacementMapError> {
        if pattern.is_empty() {
            return Err(ReplacementMapError::EmptyPattern);
        }
        if replacement.is_empty() {
            return Err(ReplacementMapError::EmptyReplacement);
        }
        if self.rules.iter().any(|r| r.pattern == pattern) {
            return Err(ReplacementMapError::DuplicatePattern(pattern.into_iter().collect()));
        }
        self.rules.push(Rule { pattern, replacement });
        Ok(())
    }

    /// Convenience constructor from `&str` pairs, mainly for tests and the
    /// CLI's TOML-loaded rule file.
    pub fn from_pairs<I, S1, S2>(pairs: I) -> Result<Self, ReplacementMapError>
    where
        I: IntoIterator<Item = (S1, S2)>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        let mut map = Self::new();
        for (pattern, replacement) in pairs {
            map.insert(pattern.as_ref().chars().collect(), replacement.as_ref().chars().collect())?;
        }
        Ok(map)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A configured `(start_marker, end_marker)` pair.
///
/// An empty `end` denotes literal-content protection: the protected
/// interval is exactly the occurrence of `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRegionSpec {
    pub start: Vec<char>,
    pub end: Vec<char>,
}

impl ProtectedRegionSpec {
    pub fn new(start: impl AsRef<str>, end: impl AsRef<str>) -> Self {
        Self { start: start.as_ref().chars().collect(), end: end.as_ref().chars().collect() }
    }

    /// A literal-content protection: the region is exactly `content`.
    pub fn literal(content: impl AsRef<str>) -> Self {
        Self { start: content.as_ref().chars().collect(), end: Vec::new() }
    }

    pub fn is_literal(&self) -> bool {
        self.end.is_empty()
    }
}

/// A concrete occurrence of a protected region in one file.
///
/// Invariant: `start_first <= end_last`. A file's interval list is sorted
/// by `start_first` and non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedInterval {
    pub start_first: usize,
    pub end_last: usize,
    pub start_len: usize,
    pub end_len: usize,
}

impl ProtectedInterval {
    /// Exclusive end, i.e. `end_last + 1`.
    pub fn end_exclusive(&self) -> usize {
        self.end_last + 1
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start_first && pos <= self.end_last
    }
}

/// A contiguous slice descriptor of a file's content assigned to one
/// worker. `end_pos` is exclusive. Page ids are dense
/// `0..n` and tile the owning `FileContent` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub id: usize,
    pub start_pos: usize,
    pub end_pos: usize,
    pub is_protected: bool,
}

impl Page {
    pub fn len(&self) -> usize {
        self.end_pos - self.start_pos
    }

    pub fn is_empty(&self) -> bool {
        self.start_pos == self.end_pos
    }
}

/// One input file, loaded and owned by the Processor, shared by every page
/// task and by the writeback notification for that file.
///
/// `content` and `protected_intervals` are write-once during preprocess and
/// read-only afterwards, so they need no synchronization. `pages_remaining`
/// and `total_replacements` are atomics. `processed_pages[i]` is a
/// `OnceLock` — it has exactly one writer (the task owning page `i`), a
/// lock-free single-assignment slot rather than an unsynchronized write.
pub struct FileContent {
    pub path: PathBuf,
    pub content: Vec<char>,
    pub protected_intervals: Vec<ProtectedInterval>,
    pages_remaining: AtomicUsize,
    total_replacements: AtomicUsize,
    processed_pages: Vec<OnceLock<Vec<char>>>,
}

impl FileContent {
    pub fn new(path: PathBuf, content: Vec<char>, protected_intervals: Vec<ProtectedInterval>, page_count: usize) -> Self {
        Self {
            path,
            content,
            protected_intervals,
            pages_remaining: AtomicUsize::new(page_count),
            total_replacements: AtomicUsize::new(0),
            processed_pages: (0..page_count).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.processed_pages.len()
    }

    /// Stores the processed text for `page_id`. Panics if called twice for
    /// the same id — each page id has exactly one owning task.
    pub fn set_processed_page(&self, page_id: usize, text: Vec<char>) {
        self.processed_pages[page_id]
            .set(text)
            .unwrap_or_else(|_| panic!("page {page_id} of {:?} processed twice", self.path));
    }

    /// Adds `count` to the running replacement total for this file.
    pub fn add_replacements(&self, count: usize) {
        self.total_replacements.fetch_add(count, Ordering::AcqRel);
    }

    pub fn total_replacements(&self) -> usize {
        self.total_replacements.load(Ordering::Acquire)
    }

    /// Decrements the pending-page counter and returns `true` iff this call
    /// drove it to zero — i.e. iff the caller is the page that completed
    /// the file. Release ordering here paired with the Acquire load in
    /// `concat_processed_pages` establishes the happens-before needed to
    /// safely read every `processed_pages` slot afterwards.
    pub fn complete_one_page(&self) -> bool {
        self.pages_remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    pub fn pages_remaining(&self) -> usize {
        self.pages_remaining.load(Ordering::Acquire)
    }

    /// Concatenates all processed pages in page-id order. Only valid once
    /// `pages_remaining()` has reached zero.
    pub fn concat_processed_pages(&self) -> Vec<char> {
        let mut out = Vec::with_capacity(self.content.len());
        for slot in &self.processed_pages {
            let piece = slot
                .get()
                .expect("concat_processed_pages called before all pages completed");
            out.extend_from_slice(piece);
        }
        out
    }
}

/// Result of processing a single page.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub file_path: PathBuf,
    pub page_id: usize,
    pub processed_text: Vec<char>,
    pub replacement_count: usize,
    pub ok: bool,
    pub err_msg: Option<String>,
}

/// Result of processing a single input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub file_path: PathBuf,
    pub ok: bool,
    pub err_msg: Option<String>,
    pub replacement_count: usize,
}

impl ProcessingResult {
    pub fn success(file_path: PathBuf, replacement_count: usize) -> Self {
        Self { file_path, ok: true, err_msg: None, replacement_count }
    }

    pub fn failure(file_path: PathBuf, err_msg: impl Into<String>) -> Self {
        Self { file_path, ok: false, err_msg: Some(err_msg.into()), replacement_count: 0 }
    }
}

/// Enqueued onto the writeback pipeline exactly once per file whose
/// preprocess succeeded, when that file's `pages_remaining` reaches zero.
///
/// `idx` is the file's position in the caller's input list, carried through
/// so the writeback outcome can be routed back to the right result slot
/// without re-deriving it from `file.path` — two input files can share a
/// path, but never share an `idx`.
pub struct WritebackNotification {
    pub file: std::sync::Arc<FileContent>,
    pub idx: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_map_rejects_duplicate_patterns() {
        let mut map = ReplacementMap::new();
        map.insert(vec![','], vec!['\u{ff0c}']).unwrap();
        let err = map.insert(vec![','], vec!['!']).unwrap_err();
        assert_eq!(err, ReplacementMapError::DuplicatePattern(",".to_string()));
    }

    #[test]
    fn replacement_map_rejects_empty_pattern_or_replacement() {
        let mut map = ReplacementMap::new();
        assert_eq!(map.insert(vec![], vec!['x']).unwrap_err(), ReplacementMapError::EmptyPattern);
        assert_eq!(map.insert(vec!['x'], vec![]).unwrap_err(), ReplacementMapError::EmptyReplacement);
    }

    #[test]
    fn file_content_completes_exactly_once_per_page_set() {
        let fc = FileContent::new(PathBuf::from("f.txt"), "ab".chars().collect(), vec![], 2);
        fc.set_processed_page(0, vec!['a']);
        assert!(!fc.complete_one_page());
        fc.set_processed_page(1, vec!['b']);
        assert!(fc.complete_one_page());
        assert_eq!(fc.concat_processed_pages(), vec!['a', 'b']);
    }
}
