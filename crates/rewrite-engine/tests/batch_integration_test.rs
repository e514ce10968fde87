//! End-to-end coverage of `run_batch` against the public API only — files
//! with ordinary replacements, protected regions, binary content, and zero
//! matches processed in a single batch.

use std::fs;

use rewrite_core::{EngineConfig, ProtectedRegionSpec, ReplacementMap};
use rewrite_engine::run_batch;

fn rules(pairs: &[(&str, &str)]) -> ReplacementMap {
    ReplacementMap::from_pairs(pairs.iter().copied()).unwrap()
}

#[test]
fn s2_mixed_batch_processes_every_file_independently() {
    let dir = tempfile::tempdir().unwrap();

    let plain = dir.path().join("plain.txt");
    fs::write(&plain, "a,b,c.").unwrap();

    let protected = dir.path().join("protected.txt");
    fs::write(&protected, "keep `a,b` but change a,b.").unwrap();

    let binary = dir.path().join("data.bin");
    let mut bytes = vec![0u8; 64];
    bytes.extend_from_slice(b"trailer");
    fs::write(&binary, &bytes).unwrap();

    let untouched = dir.path().join("untouched.txt");
    fs::write(&untouched, "no punctuation here").unwrap();

    let rule_set = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);
    let protections = vec![ProtectedRegionSpec::new("`", "`")];
    let files = vec![plain.clone(), protected.clone(), binary.clone(), untouched.clone()];

    let (results, stats) = run_batch(&files, &rule_set, &protections, &EngineConfig::default());

    assert_eq!(results.len(), 4);
    assert_eq!(stats.files_total, 4);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.files_changed, 2);

    assert!(results[0].ok);
    assert_eq!(fs::read_to_string(&plain).unwrap(), "a\u{ff0c}b\u{ff0c}c\u{3002}");

    assert!(results[1].ok);
    assert_eq!(fs::read_to_string(&protected).unwrap(), "keep `a,b` but change a\u{ff0c}b\u{3002}");

    assert!(!results[2].ok);
    assert_eq!(fs::read(&binary).unwrap(), bytes);

    assert!(results[3].ok);
    assert_eq!(results[3].replacement_count, 0);
    assert_eq!(fs::read_to_string(&untouched).unwrap(), "no punctuation here");
}

#[test]
fn s4_literal_protection_shields_an_exact_span() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.txt");
    fs::write(&path, "TODO, finish this. TODO again.").unwrap();

    let rule_set = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);
    let protections = vec![ProtectedRegionSpec::literal("TODO")];

    let (results, _) = run_batch(&[path.clone()], &rule_set, &protections, &EngineConfig::default());
    assert!(results[0].ok);
    assert_eq!(fs::read_to_string(&path).unwrap(), "TODO\u{ff0c} finish this\u{3002} TODO again\u{3002}");
}

#[test]
fn large_batch_is_internally_consistent_across_worker_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for i in 0..20 {
        let path = dir.path().join(format!("doc-{i}.txt"));
        fs::write(&path, format!("entry {i}: value, unit.")).unwrap();
        paths.push(path);
    }
    let rule_set = rules(&[(",", "\u{ff0c}"), (".", "\u{3002}")]);

    let mut config = EngineConfig::default();
    config.max_threads = Some(3);
    let (results, stats) = run_batch(&paths, &rule_set, &[], &config);

    assert_eq!(results.len(), 20);
    assert_eq!(stats.files_failed, 0);
    assert!(results.iter().all(|r| r.ok && r.replacement_count == 2));
}
