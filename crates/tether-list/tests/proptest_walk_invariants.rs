//! Property-based invariant tests for `WalkList`.
//!
//! These verify the structural guarantees that must hold for **any** sequence
//! of mutations:
//!
//! 1. The list matches a `Vec` model under arbitrary signed inserts and
//!    positional removals.
//! 2. `len` always equals the number of nodes an `iter` pass yields.
//! 3. A walk that removes an arbitrary subset of nodes mid-traversal visits
//!    exactly the nodes that were still present when it reached them, in
//!    order, with no duplicates.
//! 4. Handles of removed nodes stay dead after slot reuse.

use proptest::prelude::*;
use tether_list::WalkList;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Op {
    PushBack(u32),
    PushFront(u32),
    Insert(isize, u32),
    RemoveAt(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u32>().prop_map(Op::PushBack),
        any::<u32>().prop_map(Op::PushFront),
        (-12isize..=12, any::<u32>()).prop_map(|(i, v)| Op::Insert(i, v)),
        (0usize..16).prop_map(Op::RemoveAt),
    ]
}

/// Mirror of the signed-insert rule on a `Vec`: non-negative clamps to
/// append, negative counts from the tail with -1 meaning append.
fn model_insert(model: &mut Vec<u32>, index: isize, value: u32) {
    let len = model.len() as isize;
    let pos = if index >= 0 {
        index.min(len)
    } else {
        (len + 1 + index).max(0)
    };
    model.insert(pos as usize, value);
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Vec-model equivalence under arbitrary mutation sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn matches_vec_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let mut list = WalkList::new();
        let mut model: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                Op::PushBack(v) => {
                    list.push_back(v);
                    model.push(v);
                }
                Op::PushFront(v) => {
                    list.push_front(v);
                    model.insert(0, v);
                }
                Op::Insert(i, v) => {
                    list.insert(i, v);
                    model_insert(&mut model, i, v);
                }
                Op::RemoveAt(pos) => {
                    if pos < model.len() {
                        let id = list.seek(pos as isize).unwrap();
                        prop_assert_eq!(list.remove(id), Some(model.remove(pos)));
                    }
                }
            }

            let got: Vec<u32> = list.iter().map(|(_, v)| *v).collect();
            prop_assert_eq!(&got, &model);
            prop_assert_eq!(list.len(), model.len());
            prop_assert_eq!(list.head().map(|h| *list.get(h).unwrap()), model.first().copied());
            prop_assert_eq!(list.tail().map(|t| *list.get(t).unwrap()), model.last().copied());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Walk under mid-traversal removal visits exactly the survivors
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn walk_with_scripted_removals(
        len in 1usize..12,
        // For each visited value, an optional position (by value) to remove.
        script in proptest::collection::vec(proptest::option::of(0u32..12), 0..24),
    ) {
        let mut list = WalkList::new();
        let mut ids = std::collections::HashMap::new();
        for v in 0..len as u32 {
            ids.insert(v, list.push_back(v));
        }

        // Model: the same walk over a Vec, applying the same removal script
        // keyed by visit count. Removing the current element maps to the
        // hold flag (no step); removing an earlier element shifts the
        // current position left by one before the step.
        let mut expected = Vec::new();
        {
            let mut present: Vec<u32> = (0..len as u32).collect();
            let mut pos = 0usize;
            let mut visit = 0usize;
            while pos < present.len() {
                expected.push(present[pos]);
                let mut step = 1usize;
                if let Some(Some(target)) = script.get(visit) {
                    if let Some(at) = present.iter().position(|x| x == target) {
                        present.remove(at);
                        if at == pos {
                            step = 0;
                        } else if at < pos {
                            pos -= 1;
                        }
                    }
                }
                visit += 1;
                pos += step;
            }
        }

        let walk = list.begin_walk();
        let mut seen = Vec::new();
        let mut visit = 0usize;
        while let Some(node) = list.walk_at(walk) {
            let v = *list.get(node).unwrap();
            seen.push(v);
            if let Some(Some(target)) = script.get(visit) {
                if let Some(&id) = ids.get(target) {
                    list.remove(id); // stale ids are a no-op
                    ids.remove(target);
                }
            }
            visit += 1;
            list.advance(walk);
        }
        list.end_walk(walk);

        prop_assert_eq!(seen, expected);
        prop_assert_eq!(list.open_walks(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Removed handles stay dead through slot reuse
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stale_handles_stay_dead(values in proptest::collection::vec(any::<u32>(), 1..16)) {
        let mut list = WalkList::new();
        let mut dead = Vec::new();
        for &v in &values {
            let id = list.push_back(v);
            list.remove(id);
            dead.push(id);
            // Immediately reuse the slot.
            list.push_back(v.wrapping_add(1));
        }
        for id in dead {
            prop_assert!(list.get(id).is_none());
            prop_assert!(!list.contains(id));
            prop_assert!(list.remove(id).is_none());
        }
        prop_assert_eq!(list.len(), values.len());
    }
}
