use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_epoch::{self as epoch, Atomic};

use crate::error::{require_ordered_sentinels, require_user_key, Error};
use crate::iter::SnapshotIter;
use crate::node::Node;
use crate::ops;

/// A concurrent, linearizable ordered set of `K`, backed by a lock-free
/// external binary search tree.
///
/// Construction requires two sentinel keys strictly greater than any user
/// key the caller intends to insert (spec.md §6). The root is always
/// `Internal(sentinel2, Leaf(sentinel1), Leaf(sentinel2))`; every user key
/// therefore lives in the root's left subtree and no operation ever needs
/// a special case for an empty tree.
pub struct ConcurrentSet<K> {
    root: Atomic<Node<K>>,
    sentinel1: K,
    sentinel2: K,
    size: AtomicUsize,
}

impl<K: Ord + Clone + Debug> ConcurrentSet<K> {
    /// Constructs an empty set. Fails with [`Error::InvalidArgument`] if
    /// `sentinel1 >= sentinel2`.
    pub fn new(sentinel1: K, sentinel2: K) -> Result<Self, Error> {
        require_ordered_sentinels(&sentinel1, &sentinel2)?;
        let root = Node::internal(
            sentinel2.clone(),
            Node::leaf(sentinel1.clone()),
            Node::leaf(sentinel2.clone()),
        );
        Ok(ConcurrentSet {
            root: Atomic::new(root),
            sentinel1,
            sentinel2,
            size: AtomicUsize::new(0),
        })
    }

    /// Wait-free membership test. Linearizes at the atomic read of the
    /// child pointer on the final descent step (spec.md §5).
    pub fn contains(&self, key: &K) -> Result<bool, Error> {
        require_user_key(key, &self.sentinel1)?;
        let guard = &epoch::pin();
        Ok(ops::contains(&self.root, key, guard))
    }

    /// Lock-free insert. Returns `true` iff `key` was not already present.
    /// Linearizes at the CAS that installs `IFLAG` on the parent.
    pub fn insert(&self, key: K) -> Result<bool, Error> {
        require_user_key(&key, &self.sentinel1)?;
        let guard = &epoch::pin();
        Ok(ops::insert(&self.root, &key, &self.size, guard))
    }

    /// Lock-free delete. Returns `true` iff `key` was present and removed.
    /// Linearizes at the CAS that installs `MARK` on the parent.
    pub fn delete(&self, key: &K) -> Result<bool, Error> {
        require_user_key(key, &self.sentinel1)?;
        let guard = &epoch::pin();
        Ok(ops::delete(&self.root, key, &self.size, guard))
    }

    /// An approximate, never-negative count of keys currently present.
    /// Not linearizable with respect to concurrent operations; eventually
    /// consistent once operations quiesce (spec.md §4.6).
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// A one-shot in-order snapshot of the keys currently present.
    pub fn iter(&self) -> SnapshotIter<'_, K> {
        SnapshotIter::new(self)
    }

    pub(crate) fn root_ref(&self) -> &Atomic<Node<K>> {
        &self.root
    }

    pub(crate) fn sentinel1(&self) -> &K {
        &self.sentinel1
    }

    pub(crate) fn sentinel2(&self) -> &K {
        &self.sentinel2
    }
}

impl<K> Drop for ConcurrentSet<K> {
    fn drop(&mut self) {
        // `&mut self` guarantees no other thread holds a reference into
        // this tree, so reclamation can happen immediately instead of
        // through the epoch's deferred-destroy queue.
        let guard = &epoch::pin();
        let root = self.root.load(Ordering::Relaxed, guard);
        ops::free_whole_tree(root, guard);
    }
}
