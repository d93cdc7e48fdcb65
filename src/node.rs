use crossbeam_epoch::Atomic;

use crate::descriptor::Descriptor;

/// A node in the external binary search tree.
///
/// User keys live only in `Leaf`s; `Internal` nodes carry routing keys and
/// the two atomically-updatable child pointers plus the per-node update
/// state (see [`crate::descriptor`]).
pub(crate) enum Node<K> {
    Leaf {
        key: K,
    },
    Internal {
        key: K,
        left: Atomic<Node<K>>,
        right: Atomic<Node<K>>,
        /// Tag bits encode the node's `State` (see `descriptor::State`);
        /// the pointee is the active descriptor, or stale/`null` once the
        /// node returns to `CLEAN`.
        update: Atomic<Descriptor<K>>,
    },
}

impl<K> Node<K> {
    pub(crate) fn leaf(key: K) -> Self {
        Node::Leaf { key }
    }

    pub(crate) fn internal(key: K, left: Node<K>, right: Node<K>) -> Self {
        Node::Internal {
            key,
            left: Atomic::new(left),
            right: Atomic::new(right),
            update: Atomic::null(),
        }
    }

    pub(crate) fn key(&self) -> &K {
        match self {
            Node::Leaf { key } => key,
            Node::Internal { key, .. } => key,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub(crate) fn left(&self) -> &Atomic<Node<K>> {
        match self {
            Node::Internal { left, .. } => left,
            Node::Leaf { .. } => unreachable!("left() called on a leaf"),
        }
    }

    pub(crate) fn right(&self) -> &Atomic<Node<K>> {
        match self {
            Node::Internal { right, .. } => right,
            Node::Leaf { .. } => unreachable!("right() called on a leaf"),
        }
    }

    pub(crate) fn update(&self) -> &Atomic<Descriptor<K>> {
        match self {
            Node::Internal { update, .. } => update,
            Node::Leaf { .. } => unreachable!("update() called on a leaf"),
        }
    }
}
