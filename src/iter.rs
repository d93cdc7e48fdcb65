use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Guard, Shared};

use crate::node::Node;
use crate::set::ConcurrentSet;

/// A one-shot, in-order snapshot of the keys present in a
/// [`ConcurrentSet`] at the moment this iterator was constructed.
///
/// Construction performs a single wait-free traversal (spec.md §4.7); no
/// CAS is issued and no further reads of the tree happen afterwards, so
/// concurrent inserts/deletes that race the construction may or may not
/// be visible, and mutations after construction are never visible. The
/// sequence yielded is strictly ascending and excludes both sentinels.
pub struct SnapshotIter<'a, K> {
    set: &'a ConcurrentSet<K>,
    keys: std::vec::IntoIter<K>,
    last_returned: Option<K>,
}

impl<'a, K: Ord + Clone> SnapshotIter<'a, K> {
    pub(crate) fn new(set: &'a ConcurrentSet<K>) -> Self {
        let guard = &epoch::pin();
        let mut keys = Vec::new();
        let root = set.root_ref().load(Ordering::Acquire, guard);
        if let Node::Internal { left, .. } = unsafe { root.deref() } {
            collect(
                left.load(Ordering::Acquire, guard),
                set.sentinel1(),
                set.sentinel2(),
                guard,
                &mut keys,
            );
        }
        SnapshotIter {
            set,
            keys: keys.into_iter(),
            last_returned: None,
        }
    }

    /// The key most recently returned by [`Iterator::next`], or `None`
    /// before the first call / after exhaustion without any prior call.
    pub fn last_returned(&self) -> Option<&K> {
        self.last_returned.as_ref()
    }

    /// Removes the key most recently returned by [`Iterator::next`] from
    /// the underlying set (spec.md §4.7: "implemented by invoking
    /// `delete(lastReturned)`"). Returns `false` if nothing has been
    /// returned yet, or if the key is no longer present.
    pub fn remove_last(&mut self) -> bool {
        match &self.last_returned {
            Some(key) => self.set.delete(key).unwrap_or(false),
            None => false,
        }
    }
}

/// In-order traversal over an explicit heap-allocated stack rather than
/// native recursion: this external BST never rebalances, so a skewed
/// insertion order can drive a subtree's height into the thousands, which
/// would risk a native stack overflow if this walked the tree recursively.
fn collect<K: Ord + Clone>(
    root: Shared<'_, Node<K>>,
    sentinel1: &K,
    sentinel2: &K,
    guard: &Guard,
    out: &mut Vec<K>,
) {
    let mut pending: Vec<Shared<'_, Node<K>>> = Vec::new();
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
                if key != sentinel1 && key != sentinel2 {
                    out.push(key.clone());
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

impl<K: Clone> Iterator for SnapshotIter<'_, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let next = self.keys.next();
        if let Some(key) = &next {
            self.last_returned = Some(key.clone());
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<K: Clone> ExactSizeIterator for SnapshotIter<'_, K> {
    fn len(&self) -> usize {
        self.keys.len()
    }
}
