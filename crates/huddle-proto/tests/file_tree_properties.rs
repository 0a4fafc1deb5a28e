//! Property-based tests for file-tree merge semantics.
//!
//! The shared workspace resolves concurrent edits last-write-wins per path.
//! These properties pin down what that means: merge is the key-wise union
//! where the delta wins, and no merge ever removes a key.

use huddle_proto::{FileEntry, FileTree};
use proptest::prelude::*;

/// Small path/contents pairs; collisions between base and delta are the
/// interesting case, so paths draw from a tiny alphabet.
fn tree_strategy() -> impl Strategy<Value = FileTree> {
    prop::collection::btree_map("[a-d]\\.js", "[a-z]{0,8}", 0..6).prop_map(|m| {
        m.into_iter().map(|(k, v)| (k, FileEntry { contents: v })).collect()
    })
}

proptest! {
    #[test]
    fn merge_is_union_with_delta_winning(base in tree_strategy(), delta in tree_strategy()) {
        let mut merged = base.clone();
        merged.merge(delta.clone());

        // Every delta entry wins verbatim.
        for path in delta.paths() {
            prop_assert_eq!(merged.get(path), delta.get(path));
        }
        // Every base-only entry survives untouched.
        for path in base.paths() {
            if !delta.contains(path) {
                prop_assert_eq!(merged.get(path), base.get(path));
            }
        }
        // No keys appear from nowhere and none are dropped.
        let union_len = base.paths().chain(delta.paths()).collect::<std::collections::BTreeSet<_>>().len();
        prop_assert_eq!(merged.len(), union_len);
    }

    #[test]
    fn merge_is_idempotent(base in tree_strategy(), delta in tree_strategy()) {
        let mut once = base.clone();
        once.merge(delta.clone());
        let mut twice = once.clone();
        twice.merge(delta);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn last_writer_wins_across_successive_deltas(
        base in tree_strategy(),
        first in tree_strategy(),
        second in tree_strategy(),
    ) {
        let mut merged = base;
        merged.merge(first.clone());
        merged.merge(second.clone());

        for path in first.paths() {
            let expected = second.get(path).or_else(|| first.get(path));
            prop_assert_eq!(merged.get(path), expected);
        }
    }
}
