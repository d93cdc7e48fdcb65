//! A read-only Graphviz DOT dump of the current tree shape, for the
//! `dot_export` demo. Not part of the core linearizable contract (spec.md
//! §6 is explicit that nothing in the public interface requires exposing
//! internal structure); this module exists purely so that an external
//! collaborator can visualize a snapshot for debugging, the same way the
//! teacher's demonstrator exposes `.schema`/`.indexes` metacommands for
//! introspection without being part of the storage engine's contract.

use std::fmt::Debug;
use std::fmt::Write as _;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Guard, Shared};

use crate::node::Node;
use crate::set::ConcurrentSet;

impl<K: Ord + Clone + Debug> ConcurrentSet<K> {
    /// Renders the current tree shape as a Graphviz DOT graph. Not a
    /// linearizable snapshot: reads are unsynchronized with respect to
    /// concurrent operations, same caveat as [`ConcurrentSet::iter`].
    pub fn to_dot(&self) -> String {
        let guard = &epoch::pin();
        let root = self.root_ref().load(Ordering::Acquire, guard);
        let mut out = String::from("digraph tree {\n");
        render(root, guard, &mut out);
        out.push_str("}\n");
        out
    }
}

/// One node awaiting a DOT label, over an explicit heap-allocated stack
/// rather than native recursion: this external BST never rebalances, so a
/// skewed insertion order can drive a subtree's height into the thousands,
/// which would risk a native stack overflow if this walked the tree
/// recursively. `parent` carries the id/label of the edge to emit once this
/// node's own id has been assigned.
struct Frame<'g, K> {
    node: Shared<'g, Node<K>>,
    parent: Option<(usize, &'static str)>,
}

fn render<K: Debug>(root: Shared<'_, Node<K>>, guard: &Guard, out: &mut String) {
    let mut next_id = 0usize;
    let mut stack = vec![Frame { node: root, parent: None }];
    while let Some(Frame { node, parent }) = stack.pop() {
        let id = next_id;
        next_id += 1;
        if let Some((parent_id, label)) = parent {
            let _ = writeln!(out, "  n{parent_id} -> n{id} [label=\"{label}\"];");
        }

        if node.is_null() {
            let _ = writeln!(out, "  n{id} [label=\"null\", shape=point];");
            continue;
        }
        match unsafe { node.deref() } {
            Node::Leaf { key } => {
                let _ = writeln!(out, "  n{id} [label=\"{key:?}\", shape=box];");
            }
            Node::Internal { key, left, right, .. } => {
                let _ = writeln!(out, "  n{id} [label=\"{key:?}\", shape=circle];");
                // Pushed right-before-left so the left subtree is popped
                // (and numbered) first, matching the original pre-order scheme.
                stack.push(Frame {
                    node: right.load(Ordering::Acquire, guard),
                    parent: Some((id, "R")),
                });
                stack.push(Frame {
                    node: left.load(Ordering::Acquire, guard),
                    parent: Some((id, "L")),
                });
            }
        }
    }
}
