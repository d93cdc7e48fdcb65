use crossbeam_epoch::{Atomic, Shared};

use crate::node::Node;

/// The four states an internal node's `update` field can be in. Packed
/// into the tag bits of the `Atomic<Descriptor<K>>` pointer so that
/// `(info, state)` is always read and written together as one word.
pub(crate) const CLEAN: usize = 0;
pub(crate) const IFLAG: usize = 1;
pub(crate) const DFLAG: usize = 2;
pub(crate) const MARK: usize = 3;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) enum State {
    Clean,
    IFlag,
    DFlag,
    Mark,
}

impl State {
    pub(crate) fn from_tag(tag: usize) -> State {
        match tag {
            CLEAN => State::Clean,
            IFLAG => State::IFlag,
            DFLAG => State::DFlag,
            MARK => State::Mark,
            _ => unreachable!("update tag is always one of the four reserved values"),
        }
    }

    pub(crate) fn tag(self) -> usize {
        match self {
            State::Clean => CLEAN,
            State::IFlag => IFLAG,
            State::DFlag => DFLAG,
            State::Mark => MARK,
        }
    }
}

/// An in-flight insert or delete, published through an internal node's
/// `update` field so that any thread can help complete it.
pub(crate) enum Descriptor<K> {
    Insert(InsertInfo<K>),
    Delete(DeleteInfo<K>),
}

/// Published by `insert` once it CASes `IFLAG` onto `parent`.
///
/// `leaf` is the old leaf being replaced and `new_internal` the freshly
/// allocated three-node subtree (`new_internal` with two fresh leaf
/// children) that `help_insert` splices into `parent` in place of `leaf`.
pub(crate) struct InsertInfo<K> {
    pub(crate) parent: Atomic<Node<K>>,
    pub(crate) new_internal: Atomic<Node<K>>,
    pub(crate) leaf: Atomic<Node<K>>,
}

impl<K> InsertInfo<K> {
    pub(crate) fn new<'g>(
        parent: Shared<'g, Node<K>>,
        new_internal: Shared<'g, Node<K>>,
        leaf: Shared<'g, Node<K>>,
    ) -> Self {
        InsertInfo {
            parent: Atomic::from(parent),
            new_internal: Atomic::from(new_internal),
            leaf: Atomic::from(leaf),
        }
    }
}

/// Published by `delete` once it CASes `DFLAG` onto `grandparent`.
///
/// `parent_update_snapshot` is the `(info, state)` pair read from `parent`
/// when this descriptor was built; it is reused verbatim as the CAS
/// "expected" value in the MARK step so the step is idempotent across
/// helpers.
pub(crate) struct DeleteInfo<K> {
    pub(crate) grandparent: Atomic<Node<K>>,
    pub(crate) parent: Atomic<Node<K>>,
    pub(crate) leaf: Atomic<Node<K>>,
    pub(crate) parent_update_snapshot: Atomic<Descriptor<K>>,
}

impl<K> DeleteInfo<K> {
    pub(crate) fn new<'g>(
        grandparent: Shared<'g, Node<K>>,
        parent: Shared<'g, Node<K>>,
        leaf: Shared<'g, Node<K>>,
        parent_update_snapshot: Shared<'g, Descriptor<K>>,
    ) -> Self {
        DeleteInfo {
            grandparent: Atomic::from(grandparent),
            parent: Atomic::from(parent),
            leaf: Atomic::from(leaf),
            parent_update_snapshot: Atomic::from(parent_update_snapshot),
        }
    }
}
