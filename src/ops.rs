//! The search / insert / delete / help* routines: the lock-free core of
//! the external binary search tree. Every public operation on
//! [`crate::ConcurrentSet`] pins one [`Guard`] for its whole duration
//! (including retries), so every `Shared<'g, _>` handed out by `search`
//! stays valid until the operation returns.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;

use crate::descriptor::{DeleteInfo, Descriptor, InsertInfo, State, CLEAN, DFLAG, IFLAG, MARK};
use crate::node::Node;

/// Snapshot of a root-to-leaf descent, used by `contains`, `insert` and
/// `delete`. `grandparent`/`grandparent_update` are meaningless when
/// `grandparent` is `None` (only possible when `parent` is the root).
pub(crate) struct SearchResult<'g, K> {
    pub(crate) leaf: Shared<'g, Node<K>>,
    pub(crate) parent: Shared<'g, Node<K>>,
    pub(crate) grandparent: Option<Shared<'g, Node<K>>>,
    pub(crate) parent_update: Shared<'g, Descriptor<K>>,
    pub(crate) grandparent_update: Shared<'g, Descriptor<K>>,
}

pub(crate) fn search<'g, K: Ord>(
    root: &Atomic<Node<K>>,
    key: &K,
    guard: &'g Guard,
) -> SearchResult<'g, K> {
    let mut current = root.load(Ordering::Acquire, guard);
    let mut parent: Option<Shared<'g, Node<K>>> = None;
    let mut grandparent: Option<Shared<'g, Node<K>>> = None;
    let mut parent_update: Shared<'g, Descriptor<K>> = Shared::null();
    let mut grandparent_update: Shared<'g, Descriptor<K>> = Shared::null();

    loop {
        match unsafe { current.deref() } {
            Node::Internal {
                key: routing_key,
                left,
                right,
                update,
            } => {
                grandparent = parent;
                grandparent_update = parent_update;
                parent = Some(current);
                parent_update = update.load(Ordering::Acquire, guard);
                current = if key < routing_key {
                    left.load(Ordering::Acquire, guard)
                } else {
                    right.load(Ordering::Acquire, guard)
                };
            }
            Node::Leaf { .. } => break,
        }
    }

    SearchResult {
        leaf: current,
        parent: parent.expect("root is always an Internal node, so parent is set"),
        grandparent,
        parent_update,
        grandparent_update,
    }
}

pub(crate) fn contains<K: Ord>(root: &Atomic<Node<K>>, key: &K, guard: &Guard) -> bool {
    let result = search(root, key, guard);
    unsafe { result.leaf.deref() }.key() == key
}

pub(crate) fn insert<K: Ord + Clone>(
    root: &Atomic<Node<K>>,
    key: &K,
    size: &AtomicUsize,
    guard: &Guard,
) -> bool {
    let backoff = Backoff::new();
    loop {
        let r = search(root, key, guard);
        let existing_key = unsafe { r.leaf.deref() }.key();
        if existing_key == key {
            return false;
        }

        if State::from_tag(r.parent_update.tag()) != State::Clean {
            help(r.parent_update, guard, size);
            backoff.spin();
            continue;
        }

        let existing_key = existing_key.clone();
        let new_leaf_for_key = Node::leaf(key.clone());
        let new_leaf_for_existing = Node::leaf(existing_key.clone());
        let (left_child, right_child, routing_key) = if *key < existing_key {
            (new_leaf_for_key, new_leaf_for_existing, existing_key)
        } else {
            (new_leaf_for_existing, new_leaf_for_key, key.clone())
        };
        let new_internal = Owned::new(Node::internal(routing_key, left_child, right_child))
            .into_shared(guard);

        let ins_info = InsertInfo::new(r.parent, new_internal, r.leaf);
        let descriptor = Owned::new(Descriptor::Insert(ins_info)).with_tag(IFLAG);

        let parent_ref = unsafe { r.parent.deref() };
        match parent_ref.update().compare_exchange(
            r.parent_update,
            descriptor,
            Ordering::AcqRel,
            Ordering::Acquire,
            guard,
        ) {
            Ok(installed) => {
                if !r.parent_update.is_null() {
                    unsafe { guard.defer_destroy(r.parent_update) };
                }
                help_insert(installed, guard, size);
                return true;
            }
            Err(err) => {
                if let Descriptor::Insert(failed) = &*err.new {
                    let orphaned = failed.new_internal.load(Ordering::Relaxed, guard);
                    destroy_subtree(orphaned, guard);
                }
                drop(err.new);
                let current = parent_ref.update().load(Ordering::Acquire, guard);
                help(current, guard, size);
                backoff.spin();
            }
        }
    }
}

pub(crate) fn delete<K: Ord + Clone>(
    root: &Atomic<Node<K>>,
    key: &K,
    size: &AtomicUsize,
    guard: &Guard,
) -> bool {
    let backoff = Backoff::new();
    loop {
        let r = search(root, key, guard);
        if unsafe { r.leaf.deref() }.key() != key {
            return false;
        }

        let grandparent = match r.grandparent {
            Some(g) => g,
            // Every deletable leaf has a grandparent: the root's right
            // child is the permanent top sentinel, so `parent` is never
            // the root for a user key. See spec.md §4.1.
            None => return false,
        };

        if State::from_tag(r.grandparent_update.tag()) != State::Clean {
            help(r.grandparent_update, guard, size);
            backoff.spin();
            continue;
        }
        if State::from_tag(r.parent_update.tag()) != State::Clean {
            help(r.parent_update, guard, size);
            backoff.spin();
            continue;
        }

        let del_info = DeleteInfo::new(grandparent, r.parent, r.leaf, r.parent_update);
        let descriptor = Owned::new(Descriptor::Delete(del_info)).with_tag(DFLAG);

        let grandparent_ref = unsafe { grandparent.deref() };
        match grandparent_ref.update().compare_exchange(
            r.grandparent_update,
            descriptor,
            Ordering::AcqRel,
            Ordering::Acquire,
            guard,
        ) {
            Ok(installed) => {
                if !r.grandparent_update.is_null() {
                    unsafe { guard.defer_destroy(r.grandparent_update) };
                }
                if help_delete(installed, guard, size) {
                    return true;
                }
                backoff.spin();
            }
            Err(err) => {
                drop(err.new);
                let current = grandparent_ref.update().load(Ordering::Acquire, guard);
                help(current, guard, size);
                backoff.spin();
            }
        }
    }
}

/// `help(info, state)` from spec.md §4.5.
pub(crate) fn help<K: Ord + Clone>(update: Shared<'_, Descriptor<K>>, guard: &Guard, size: &AtomicUsize) {
    match State::from_tag(update.tag()) {
        State::Clean => {}
        State::IFlag => help_insert(update, guard, size),
        State::DFlag => {
            let _ = help_delete(update, guard, size);
        }
        State::Mark => help_marked(update, guard, size),
    }
}

pub(crate) fn help_insert<K: Ord + Clone>(
    info: Shared<'_, Descriptor<K>>,
    guard: &Guard,
    size: &AtomicUsize,
) {
    let ins = match unsafe { info.deref() } {
        Descriptor::Insert(ins) => ins,
        Descriptor::Delete(_) => return,
    };
    let parent = ins.parent.load(Ordering::Acquire, guard);
    let parent_ref = unsafe { parent.deref() };
    let old_leaf = ins.leaf.load(Ordering::Acquire, guard);
    let new_internal = ins.new_internal.load(Ordering::Acquire, guard);

    let mut installed = false;
    let left_val = parent_ref.left().load(Ordering::Acquire, guard);
    if left_val == old_leaf {
        if parent_ref
            .left()
            .compare_exchange(old_leaf, new_internal, Ordering::AcqRel, Ordering::Acquire, guard)
            .is_ok()
        {
            installed = true;
        }
    } else {
        let right_val = parent_ref.right().load(Ordering::Acquire, guard);
        if right_val == old_leaf
            && parent_ref
                .right()
                .compare_exchange(old_leaf, new_internal, Ordering::AcqRel, Ordering::Acquire, guard)
                .is_ok()
        {
            installed = true;
        }
    }

    if installed {
        size.fetch_add(1, Ordering::AcqRel);
        unsafe { guard.defer_destroy(old_leaf) };
    }

    let _ = parent_ref.update().compare_exchange(
        info,
        info.with_tag(CLEAN),
        Ordering::AcqRel,
        Ordering::Acquire,
        guard,
    );
}

/// Returns `true` iff the delete completed (the MARK step succeeded).
pub(crate) fn help_delete<K: Ord + Clone>(
    info: Shared<'_, Descriptor<K>>,
    guard: &Guard,
    size: &AtomicUsize,
) -> bool {
    let del = match unsafe { info.deref() } {
        Descriptor::Delete(del) => del,
        Descriptor::Insert(_) => return false,
    };
    let parent = del.parent.load(Ordering::Acquire, guard);
    let parent_ref = unsafe { parent.deref() };
    let expected_parent_update = del.parent_update_snapshot.load(Ordering::Acquire, guard);

    match parent_ref.update().compare_exchange(
        expected_parent_update,
        info.with_tag(MARK),
        Ordering::AcqRel,
        Ordering::Acquire,
        guard,
    ) {
        Ok(_) => {
            help_marked(info, guard, size);
            true
        }
        Err(_) => {
            let current = parent_ref.update().load(Ordering::Acquire, guard);
            help(current, guard, size);

            let grandparent = del.grandparent.load(Ordering::Acquire, guard);
            let grandparent_ref = unsafe { grandparent.deref() };
            let _ = grandparent_ref.update().compare_exchange(
                info,
                info.with_tag(CLEAN),
                Ordering::AcqRel,
                Ordering::Acquire,
                guard,
            );
            false
        }
    }
}

pub(crate) fn help_marked<K: Ord + Clone>(
    info: Shared<'_, Descriptor<K>>,
    guard: &Guard,
    size: &AtomicUsize,
) {
    let del = match unsafe { info.deref() } {
        Descriptor::Delete(del) => del,
        Descriptor::Insert(_) => return,
    };
    let parent = del.parent.load(Ordering::Acquire, guard);
    let parent_ref = unsafe { parent.deref() };
    let leaf = del.leaf.load(Ordering::Acquire, guard);

    let left_val = parent_ref.left().load(Ordering::Acquire, guard);
    let right_val = parent_ref.right().load(Ordering::Acquire, guard);
    let other = if left_val == leaf { right_val } else { left_val };

    let grandparent = del.grandparent.load(Ordering::Acquire, guard);
    let grandparent_ref = unsafe { grandparent.deref() };

    let mut spliced = false;
    let gp_left = grandparent_ref.left().load(Ordering::Acquire, guard);
    if gp_left == parent {
        if grandparent_ref
            .left()
            .compare_exchange(parent, other, Ordering::AcqRel, Ordering::Acquire, guard)
            .is_ok()
        {
            spliced = true;
        }
    } else {
        let gp_right = grandparent_ref.right().load(Ordering::Acquire, guard);
        if gp_right == parent
            && grandparent_ref
                .right()
                .compare_exchange(parent, other, Ordering::AcqRel, Ordering::Acquire, guard)
                .is_ok()
        {
            spliced = true;
        }
    }

    if spliced {
        size.fetch_sub(1, Ordering::AcqRel);
        unsafe {
            guard.defer_destroy(parent);
            guard.defer_destroy(leaf);
        }
    }

    let _ = grandparent_ref.update().compare_exchange(
        info,
        info.with_tag(CLEAN),
        Ordering::AcqRel,
        Ordering::Acquire,
        guard,
    );
}

/// Frees a subtree that was allocated speculatively by `insert` but lost
/// its CAS race and was never published. Never called on a reachable
/// (published) subtree.
///
/// Walks an explicit heap-allocated worklist instead of recursing: this
/// external BST never rebalances, so a skewed subtree can be thousands of
/// levels deep, which would risk a native stack overflow under recursion.
fn destroy_subtree<K>(node: Shared<'_, Node<K>>, guard: &Guard) {
    let mut worklist = vec![node];
    while let Some(node) = worklist.pop() {
        if node.is_null() {
            continue;
        }
        unsafe {
            if let Node::Internal { left, right, .. } = node.deref() {
                worklist.push(left.load(Ordering::Relaxed, guard));
                worklist.push(right.load(Ordering::Relaxed, guard));
            }
            drop(node.into_owned());
        }
    }
}

/// Frees every reachable node (and any still-attached descriptor) in a
/// whole tree. Only safe to call with exclusive access, i.e. from
/// `ConcurrentSet`'s `Drop` impl: no other thread can be mid-operation.
/// Iterative for the same reason as `destroy_subtree`.
pub(crate) fn free_whole_tree<K>(node: Shared<'_, Node<K>>, guard: &Guard) {
    let mut worklist = vec![node];
    while let Some(node) = worklist.pop() {
        if node.is_null() {
            continue;
        }
        unsafe {
            if let Node::Internal {
                left, right, update, ..
            } = node.deref()
            {
                worklist.push(left.load(Ordering::Relaxed, guard));
                worklist.push(right.load(Ordering::Relaxed, guard));
                let u = update.load(Ordering::Relaxed, guard);
                if !u.is_null() {
                    drop(u.into_owned());
                }
            }
            drop(node.into_owned());
        }
    }
}
