//! Concurrent collections over ordered singly-linked lists, one per
//! synchronization discipline:
//!
//! - [`CoarseSet`]: one lock around the whole list.
//! - [`FineSet`], [`FineMultiset`]: a lock per node, hand-over-hand.
//! - [`OptimisticSet`]: unlocked search, lock two nodes, re-walk to validate.
//! - [`LazySet`]: like optimistic, with logical deletion and lock-free `contains`.
//! - [`LockFreeSet`]: Harris–Michael list, mark bit packed into the next pointer.
//! - [`TreiberStack`]: lock-free stack.
//!
//! Elements are `i32`. Lists are bounded by sentinels keyed outside the
//! `i32` range, so every `i32` is a valid element.

mod coarse;
mod event;
mod fine;
mod hazard;
mod lazy;
mod lock_free;
mod multiset;
mod optimistic;
mod sequential;
mod tagged;
mod treiber;

pub use coarse::CoarseSet;
pub use event::{Divergence, Event, History, Recorder, Unmonitored};
pub use fine::FineSet;
pub use lazy::LazySet;
pub use lock_free::LockFreeSet;
pub use multiset::FineMultiset;
pub use optimistic::OptimisticSet;
pub use sequential::{SequentialMultiset, SequentialSet};
pub use treiber::TreiberStack;
pub(crate) use tagged::MaybeTagged;

extern crate alloc;

/// Key of the head sentinel; below every element.
pub(crate) const HEAD_KEY: i64 = i64::MIN;
/// Key of the tail sentinel; above every element.
pub(crate) const TAIL_KEY: i64 = i64::MAX;

/// Returned by [`Stack::pop_or_empty`] when there is nothing to pop.
pub const EMPTY_STACK_VALUE: i32 = -1;

/// A set of `i32` shared between threads.
pub trait Set: Send + Sync {
    /// Inserts `elem`. Returns `false`, leaving the set untouched, if it was
    /// already present.
    fn add(&self, elem: i32) -> bool;

    /// Removes `elem`. Returns `false` if it was absent.
    fn remove(&self, elem: i32) -> bool;

    fn contains(&self, elem: i32) -> bool;

    /// The elements in ascending order.
    fn to_vec(&mut self) -> Vec<i32>;
}

/// A multiset of `i32` shared between threads.
pub trait Multiset: Send + Sync {
    /// Inserts one more `elem`. Always succeeds.
    fn add(&self, elem: i32) -> bool;

    /// Removes a single occurrence of `elem`. Returns `false` if there was none.
    fn remove(&self, elem: i32) -> bool;

    /// Number of occurrences of `elem`.
    fn count(&self, elem: i32) -> usize;

    /// The elements in ascending order, repeats included.
    fn to_vec(&mut self) -> Vec<i32>;
}

/// A LIFO stack of `i32` shared between threads.
pub trait Stack: Send + Sync {
    /// Pushes `elem`. Always succeeds.
    fn push(&self, elem: i32) -> bool;

    fn pop(&self) -> Option<i32>;

    fn size(&self) -> usize;

    /// Like [`pop`](Stack::pop), with [`EMPTY_STACK_VALUE`] standing in for
    /// an empty stack.
    fn pop_or_empty(&self) -> i32 {
        self.pop().unwrap_or(EMPTY_STACK_VALUE)
    }
}

#[cfg(feature = "arbitrary")]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Operation {
    Add { elem: i32 },
    Remove { elem: i32 },
    Contains { elem: i32 },
    Push { elem: i32 },
    Pop,
    Size,
}
