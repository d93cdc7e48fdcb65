//! White-box concurrent stress tests: these need `pub(crate)` access to
//! `ops`/`node` directly (rather than going through `ConcurrentSet`) so
//! that they can assert the structural invariants from spec.md §8 that
//! are not part of the public contract — every internal node's `update`
//! tag is CLEAN after quiescence, and the BST property holds on the
//! actual tree, not just on what the iterator happens to yield.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Shared};

use crate::descriptor::State;
use crate::node::Node;
use crate::ops;

const SENTINEL1: i64 = i64::MAX - 1;
const SENTINEL2: i64 = i64::MAX;

fn fresh_root() -> Atomic<Node<i64>> {
    Atomic::new(Node::internal(SENTINEL2, Node::leaf(SENTINEL1), Node::leaf(SENTINEL2)))
}

/// In-order traversal over an explicit heap-allocated stack: this tree
/// never rebalances, so a skewed run of inserts can make a subtree
/// thousands of levels deep, which would risk a native stack overflow
/// under recursion.
fn collect_keys(root: Shared<'_, Node<i64>>, guard: &Guard, out: &mut Vec<i64>) {
    let mut pending: Vec<Shared<'_, Node<i64>>> = Vec::new();
    let mut current = root;
    loop {
        while !current.is_null() {
            match unsafe { current.deref() } {
                Node::Internal { left, .. } => {
                    pending.push(current);
                    current = left.load(Ordering::Acquire, guard);
                }
                Node::Leaf { .. } => break,
            }
        }

        if !current.is_null() {
            if let Node::Leaf { key } = unsafe { current.deref() } {
                if *key != SENTINEL1 && *key != SENTINEL2 {
                    out.push(*key);
                }
            }
        }

        match pending.pop() {
            Some(parent) => {
                current = match unsafe { parent.deref() } {
                    Node::Internal { right, .. } => right.load(Ordering::Acquire, guard),
                    Node::Leaf { .. } => unreachable!("only internal nodes are pushed"),
                };
            }
            None => break,
        }
    }
}

/// Iterative for the same reason as `collect_keys`.
fn assert_all_clean(root: Shared<'_, Node<i64>>, guard: &Guard) {
    let mut worklist = vec![root];
    while let Some(node) = worklist.pop() {
        if node.is_null() {
            continue;
        }
        if let Node::Internal { left, right, update, .. } = unsafe { node.deref() } {
            let tag = update.load(Ordering::Acquire, guard).tag();
            assert_eq!(
                State::from_tag(tag),
                State::Clean,
                "internal node left non-CLEAN after quiescence"
            );
            worklist.push(left.load(Ordering::Acquire, guard));
            worklist.push(right.load(Ordering::Acquire, guard));
        }
    }
}

#[test]
fn eight_threads_disjoint_ranges_scenario_5() {
    let root = fresh_root();
    let size = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..8i64 {
            let root = &root;
            let size = &size;
            scope.spawn(move |_| {
                for k in (t * 1000)..(t * 1000 + 1000) {
                    let guard = &epoch::pin();
                    assert!(ops::insert(root, &k, size, guard));
                }
            });
        }
    })
    .expect("worker thread panicked");

    let guard = &epoch::pin();
    let mut keys = Vec::new();
    collect_keys(root.load(Ordering::Acquire, guard), guard, &mut keys);
    keys.sort_unstable();
    let expected: Vec<i64> = (0..8000).collect();
    assert_eq!(keys, expected);
    assert_eq!(size.load(Ordering::Acquire), 8000);
    assert_all_clean(root.load(Ordering::Acquire, guard), guard);
}

#[test]
fn two_threads_hammer_same_key_scenario_6() {
    let root = fresh_root();
    let size = AtomicUsize::new(0);
    const ITERS: usize = 5000;

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..2 {
            let root = &root;
            let size = &size;
            scope.spawn(move |_| {
                for _ in 0..ITERS {
                    let guard = &epoch::pin();
                    let _ = ops::insert(root, &100i64, size, guard);
                    let _ = ops::delete(root, &100i64, size, guard);
                }
            });
        }
    })
    .expect("worker thread panicked");

    let guard = &epoch::pin();
    let root_shared = root.load(Ordering::Acquire, guard);
    let mut keys = Vec::new();
    collect_keys(root_shared, guard, &mut keys);
    assert!(keys.is_empty(), "tree should be empty after balanced insert/delete pairs");
    assert_eq!(size.load(Ordering::Acquire), 0);
    assert_all_clean(root_shared, guard);
}

#[test]
fn mixed_inserts_and_deletes_preserve_bst_order() {
    let root = fresh_root();
    let size = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..4i64 {
            let root = &root;
            let size = &size;
            scope.spawn(move |_| {
                for i in 0..500 {
                    let key = (i * 4 + t) % 200;
                    let guard = &epoch::pin();
                    if i % 3 == 0 {
                        let _ = ops::delete(root, &key, size, guard);
                    } else {
                        let _ = ops::insert(root, &key, size, guard);
                    }
                }
            });
        }
    })
    .expect("worker thread panicked");

    let guard = &epoch::pin();
    let root_shared = root.load(Ordering::Acquire, guard);
    let mut keys = Vec::new();
    collect_keys(root_shared, guard, &mut keys);
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(keys, sorted, "leaves are not in strict ascending order");
    assert_all_clean(root_shared, guard);
}
