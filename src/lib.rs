//! A lock-free, linearizable ordered set backed by the non-blocking
//! external binary search tree of Ellen, Fatourou, Ruppert and van Breugel
//! ("Non-blocking Binary Search Trees", PODC 2010).
//!
//! The set supports concurrent [`ConcurrentSet::contains`],
//! [`ConcurrentSet::insert`] and [`ConcurrentSet::delete`] from any number
//! of threads with no mutual exclusion, plus a one-shot
//! [`ConcurrentSet::iter`] snapshot. `contains` and snapshot construction
//! are wait-free; `insert`/`delete` are lock-free. See `DESIGN.md` for the
//! concurrency argument and the design decisions recorded against the
//! open questions in the algorithm's source material.

mod descriptor;
mod dot;
mod error;
mod iter;
#[cfg(test)]
mod invariants;
mod node;
mod ops;
mod set;

pub use error::Error;
pub use iter::SnapshotIter;
pub use set::ConcurrentSet;
