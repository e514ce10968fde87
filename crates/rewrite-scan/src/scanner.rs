//! The protected-region scanner.
//!
//! A single left-to-right pass identifies inviolate spans from configured
//! `(start, end)` marker pairs, in the caller-provided order — the first
//! marker that matches as a prefix of the remaining text wins, so callers
//! needing to disambiguate overlapping markers (one a prefix of another)
//! order their longer/more-specific markers first.

use rewrite_core::{ProtectedInterval, ProtectedRegionSpec};

/// Scans `text` for protected intervals defined by `specs`, in the order
/// given. Returns a list sorted by `start_first`, pairwise non-overlapping
/// by construction.
///
/// An unterminated start marker (no matching end before EOF) ends the scan
/// without emitting an interval for that occurrence — no further intervals
/// are found after that point either, since the scanner never resumes past
/// an unresolved start.
pub fn scan_protected_intervals(text: &[char], specs: &[ProtectedRegionSpec]) -> Vec<ProtectedInterval> {
    let mut intervals = Vec::new();
    let mut pos = 0usize;

    while pos < text.len() {
        let Some(spec) = specs.iter().find(|spec| starts_with_at(text, pos, &spec.start)) else {
            pos += 1;
            continue;
        };

        let start_first = pos;
        let start_len = spec.start.len();

        if spec.is_literal() {
            let end_last = start_first + start_len - 1;
            intervals.push(ProtectedInterval { start_first, end_last, start_len, end_len: 0 });
            pos = end_last + 1;
            continue;
        }

        match find_from(text, pos + start_len, &spec.end) {
            Some(end_begin) => {
                let end_len = spec.end.len();
                let end_last = end_begin + end_len - 1;
                intervals.push(ProtectedInterval { start_first, end_last, start_len, end_len });
                pos = end_last + 1;
            }
            None => {
                tracing::debug!(
                    start_first,
                    "unterminated protected-region start marker, ending scan"
                );
                break;
            }
        }
    }

    intervals
}

fn starts_with_at(text: &[char], pos: usize, pattern: &[char]) -> bool {
    if pattern.is_empty() {
        return false;
    }
    text.get(pos..pos + pattern.len()) == Some(pattern)
}

fn find_from(text: &[char], from: usize, pattern: &[char]) -> Option<usize> {
    if pattern.is_empty() || from > text.len() {
        return None;
    }
    (from..=text.len().saturating_sub(pattern.len())).find(|&i| &text[i..i + pattern.len()] == pattern)
}
