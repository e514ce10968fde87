use std::collections::HashMap;

use rewrite_core::ReplacementMap;

struct TrieNode {
    children: HashMap<char, usize>,
    /// Present iff this node terminates a pattern.
    replacement: Option<Vec<char>>,
    /// Scalars consumed by the terminating pattern; 0 if this node does
    /// not terminate one.
    pattern_len: usize,
}

impl TrieNode {
    fn empty() -> Self {
        Self { children: HashMap::new(), replacement: None, pattern_len: 0 }
    }
}

/// A compiled index over a [`ReplacementMap`]. Build once, apply to as many
/// buffers as needed — `apply` never mutates the index or the map it was
/// built from.
pub struct Matcher {
    nodes: Vec<TrieNode>,
}

impl Matcher {
    /// Builds a trie over `map`'s patterns. An empty map yields a matcher
    /// whose `apply` is an identity function with zero replacements.
    pub fn build(map: &ReplacementMap) -> Self {
        let mut nodes = vec![TrieNode::empty()];
        for rule in map.rules() {
            let mut node = 0;
            for &scalar in &rule.pattern {
                node = match nodes[node].children.get(&scalar) {
                    Some(&next) => next,
                    None => {
                        nodes.push(TrieNode::empty());
                        let next = nodes.len() - 1;
                        nodes[node].children.insert(scalar, next);
                        next
                    }
                };
            }
            nodes[node].replacement = Some(rule.replacement.clone());
            nodes[node].pattern_len = rule.pattern.len();
        }
        Self { nodes }
    }

    /// Applies longest-match-at-position, left-to-right, non-overlapping
    /// replacement to `text`. Returns the rewritten buffer and the number
    /// of replacements applied. Verbatim runs are coalesced into a single
    /// `extend_from_slice` per run rather than copied scalar-by-scalar.
    pub fn apply(&self, text: &[char]) -> (Vec<char>, usize) {
        let mut out = Vec::with_capacity(text.len());
        let mut count = 0usize;
        let mut copy_start = 0usize;
        let mut i = 0usize;

        while i < text.len() {
            match self.longest_match_at(text, i) {
                Some((consumed, replacement)) => {
                    out.extend_from_slice(&text[copy_start..i]);
                    out.extend_from_slice(replacement);
                    i += consumed;
                    copy_start = i;
                    count += 1;
                }
                None => i += 1,
            }
        }
        out.extend_from_slice(&text[copy_start..]);
        (out, count)
    }

    /// Walks the trie from the root following `text[pos..]`, remembering
    /// the deepest terminal node encountered. Returns the terminal's
    /// pattern length and replacement, or `None` if no pattern matches as
    /// a prefix of `text[pos..]`.
    fn longest_match_at(&self, text: &[char], pos: usize) -> Option<(usize, &[char])> {
        let mut node = 0usize;
        let mut j = pos;
        let mut best: Option<(usize, &[char])> = None;

        loop {
            if let Some(rep) = &self.nodes[node].replacement {
                best = Some((self.nodes[node].pattern_len, rep.as_slice()));
            }
            let Some(&scalar) = text.get(j) else { break };
            match self.nodes[node].children.get(&scalar) {
                Some(&next) => {
                    node = next;
                    j += 1;
                }
                None => break,
            }
        }
        best
    }
}
