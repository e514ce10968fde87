//! Page boundary computation.
//!
//! Carves a file's content into bounded-size pages so they can be handed
//! to independent workers, snapping non-protected page boundaries to a
//! newline (falling back to a space) so a page rarely ends mid-word, and
//! never splitting a protected interval across two pages.

use rewrite_core::config::BOUNDARY_SNAP_WINDOW;
use rewrite_core::{Page, ProtectedInterval};

/// Splits `content` into pages that tile it exactly, honoring
/// `protected_intervals`: every protected interval is covered by exactly
/// one protected page, and no non-protected page overlaps one.
///
/// `page_size` is the target size in scalars for non-protected pages;
/// protected pages may be arbitrarily larger. A `page_size` of 0 is
/// treated as 1 to guarantee forward progress.
pub fn paginate(content: &[char], protected_intervals: &[ProtectedInterval], page_size: usize) -> Vec<Page> {
    let page_size = page_size.max(1);
    let len = content.len();
    let mut pages = Vec::new();
    let mut start = 0usize;
    let mut k = 0usize;
    let mut id = 0usize;

    while start < len {
        if k < protected_intervals.len() && protected_intervals[k].start_first == start {
            let end = protected_intervals[k].end_exclusive();
            pages.push(Page { id, start_pos: start, end_pos: end, is_protected: true });
            start = end;
            k += 1;
            id += 1;
            continue;
        }

        let mut end = (start + page_size).min(len);
        let next_start = protected_intervals.get(k).map(|iv| iv.start_first);
        if let Some(next) = next_start {
            if end > next {
                end = next;
            }
        }

        let interval_follows_immediately = next_start == Some(end);
        if end < len && !interval_follows_immediately {
            end = snap_boundary(content, start, end);
            if let Some(next) = next_start {
                if end > next {
                    end = next;
                }
            }
        }

        pages.push(Page { id, start_pos: start, end_pos: end, is_protected: false });
        start = end;
        id += 1;
    }

    pages
}

/// Snaps `end` leftward to just after the nearest newline within the last
/// [`BOUNDARY_SNAP_WINDOW`] scalars; failing that, just after the nearest
/// space; failing that, leaves `end` untouched.
fn snap_boundary(content: &[char], start: usize, end: usize) -> usize {
    let window_start = start.max(end.saturating_sub(BOUNDARY_SNAP_WINDOW));
    if let Some(idx) = (window_start..end).rev().find(|&i| content[i] == '\n') {
        return idx + 1;
    }
    if let Some(idx) = (window_start..end).rev().find(|&i| content[i] == ' ') {
        return idx + 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn assert_tiles_exactly(pages: &[Page], len: usize) {
        assert_eq!(pages[0].start_pos, 0);
        assert_eq!(pages.last().unwrap().end_pos, len);
        for pair in pages.windows(2) {
            assert_eq!(pair[0].end_pos, pair[1].start_pos);
        }
    }

    #[test]
    fn small_file_is_a_single_page() {
        let text = chars("hello, world.");
        let pages = paginate(&text, &[], 16 * 1024);
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].is_protected);
        assert_tiles_exactly(&pages, text.len());
    }

    #[test]
    fn protected_interval_becomes_its_own_page() {
        let text = chars("a, b `c, d` e.");
        let iv = ProtectedInterval { start_first: 5, end_last: 10, start_len: 1, end_len: 1 };
        let pages = paginate(&text, &[iv], 16 * 1024);
        assert_tiles_exactly(&pages, text.len());
        let protected: Vec<_> = pages.iter().filter(|p| p.is_protected).collect();
        assert_eq!(protected.len(), 1);
        assert_eq!(protected[0].start_pos, 5);
        assert_eq!(protected[0].end_pos, 11);
    }

    #[test]
    fn non_protected_page_never_overlaps_protected_interval() {
        let text = chars("a, b `c, d` e.");
        let iv = ProtectedInterval { start_first: 5, end_last: 10, start_len: 1, end_len: 1 };
        let pages = paginate(&text, &[iv], 3);
        for page in &pages {
            if !page.is_protected {
                assert!(page.end_pos <= iv.start_first || page.start_pos > iv.end_last);
            }
        }
    }

    #[test]
    fn large_page_snaps_to_newline_within_window() {
        let mut text = vec!['a'; 50];
        text.push('\n');
        text.extend(vec!['b'; 60]);
        let pages = paginate(&text, &[], 80);
        // Target end is 80, the last newline within [0,80) is at index 50.
        assert_eq!(pages[0].end_pos, 51);
        assert_tiles_exactly(&pages, text.len());
    }

    #[test]
    fn falls_back_to_space_when_no_newline_in_window() {
        let mut text = vec!['a'; 70];
        text.push(' ');
        text.extend(vec!['b'; 40]);
        let pages = paginate(&text, &[], 80);
        assert_eq!(pages[0].end_pos, 71);
    }

    #[test]
    fn keeps_tentative_end_when_no_boundary_in_window() {
        let text = vec!['a'; 200];
        let pages = paginate(&text, &[], 80);
        assert_eq!(pages[0].end_pos, 80);
    }

    #[test]
    fn page_ending_exactly_at_interval_start_does_not_snap() {
        // page_size chosen so the tentative end lands exactly on the
        // interval start; no snapping should be attempted past it.
        let mut text = vec!['x'; 10];
        text.extend(vec!['\n', '\n']);
        text.extend(vec!['y'; 5]);
        let iv = ProtectedInterval { start_first: 12, end_last: 12, start_len: 1, end_len: 0 };
        let pages = paginate(&text, &[iv], 12);
        assert_eq!(pages[0].end_pos, 12);
        assert_tiles_exactly(&pages, text.len());
    }

    #[test]
    fn empty_content_yields_no_pages() {
        let pages = paginate(&[], &[], 16);
        assert!(pages.is_empty());
    }
}
