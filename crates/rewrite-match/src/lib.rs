//! # rewrite-match
//!
//! A compiled multi-pattern matcher. Given a [`rewrite_core::ReplacementMap`],
//! builds a trie over the patterns and applies longest-match-at-position,
//! left-to-right, non-overlapping replacement to a scalar-value buffer.
//!
//! Failure links (Aho-Corasick's usual machinery for jumping to the next
//! candidate start on a mismatch) are intentionally not built here: this
//! matcher's contract only needs the longest match that starts *at* the
//! current position, and re-walks from the root at the next position after
//! every non-match or replacement. For pattern sets with no shared
//! non-trivial prefixes — the common case for punctuation rewrite rules —
//! that re-walk touches at most a handful of nodes, so the failure-link
//! optimization buys nothing. An implementation wanting full
//! Aho-Corasick-style matching over unrelated pattern sets with shared
//! prefixes can add failure links without changing this module's external
//! contract.

mod trie;

pub use trie::Matcher;
