//! Fuzz target for file-tree merge semantics.
//!
//! # Invariants
//!
//! - Merge never removes a path
//! - Every delta path ends up with the delta's contents (last write wins)
//! - Paths absent from the delta keep their previous contents
//! - Merge is idempotent

#![no_main]

use arbitrary::Arbitrary;
use huddle_proto::{FileEntry, FileTree};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct MergeScenario {
    base: Vec<(String, String)>,
    delta: Vec<(String, String)>,
}

fn tree(entries: &[(String, String)]) -> FileTree {
    entries
        .iter()
        .map(|(path, contents)| (path.clone(), FileEntry { contents: contents.clone() }))
        .collect()
}

fuzz_target!(|scenario: MergeScenario| {
    let base = tree(&scenario.base);
    let delta = tree(&scenario.delta);

    let mut merged = base.clone();
    merged.merge(delta.clone());

    for path in base.paths() {
        assert!(merged.contains(path), "merge removed a path");
    }
    for (path, entry) in &delta.0 {
        assert_eq!(merged.get(path), Some(entry), "delta must win on its paths");
    }
    for (path, entry) in &base.0 {
        if !delta.contains(path) {
            assert_eq!(merged.get(path), Some(entry), "untouched path changed");
        }
    }

    let mut twice = merged.clone();
    twice.merge(delta);
    assert_eq!(twice, merged, "merge must be idempotent");
});
