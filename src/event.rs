//! Operation events reported at linearization points.
//!
//! Every collection takes a [`Recorder`]. The lock-based collections report
//! while still holding the locks that make the operation take effect, so the
//! order of a [`History`] is a valid linearization. The lock-free ones report
//! right after their successful compare-and-swap, so overlapping operations
//! may show up in either order; [`History::net_counts`] does not care.

use crate::sequential::{SequentialMultiset, SequentialSet};
use alloc::collections::BTreeMap;
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

/// One completed operation, with its argument and outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Add { elem: i32, result: bool },
    Remove { elem: i32, result: bool },
    Contains { elem: i32, result: bool },
    Count { elem: i32, result: usize },
    Push { elem: i32 },
    Pop { result: Option<i32> },
    Size { result: usize },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Add { elem, result } => write!(f, "add({}) -> {}", elem, result),
            Event::Remove { elem, result } => write!(f, "remove({}) -> {}", elem, result),
            Event::Contains { elem, result } => write!(f, "contains({}) -> {}", elem, result),
            Event::Count { elem, result } => write!(f, "count({}) -> {}", elem, result),
            Event::Push { elem } => write!(f, "push({})", elem),
            Event::Pop { result: Some(v) } => write!(f, "pop() -> {}", v),
            Event::Pop { result: None } => write!(f, "pop() -> empty"),
            Event::Size { result } => write!(f, "size() -> {}", result),
        }
    }
}

/// Sink for [`Event`]s.
pub trait Recorder: Send + Sync {
    fn record(&self, event: Event);
}

/// Drops every event. The default recorder of every collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmonitored;

impl Recorder for Unmonitored {
    #[inline]
    fn record(&self, _event: Event) {}
}

impl<R: Recorder + ?Sized> Recorder for &R {
    fn record(&self, event: Event) {
        (**self).record(event)
    }
}

impl<R: Recorder + ?Sized> Recorder for Arc<R> {
    fn record(&self, event: Event) {
        (**self).record(event)
    }
}

/// Recorded events in the order they were reported.
#[derive(Debug, Default)]
pub struct History {
    events: Mutex<Vec<Event>>,
}

impl Recorder for History {
    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// The first recorded event that the sequential baseline disagrees with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Position of the event in the history.
    pub index: usize,
    pub recorded: Event,
    /// What the sequential baseline returned for the same call.
    pub expected: Event,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event {} recorded `{}` but sequential replay gives `{}`",
            self.index, self.recorded, self.expected
        )
    }
}

impl std::error::Error for Divergence {}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Successful adds minus successful removes, per element.
    ///
    /// Independent of the order events were recorded in: for a set every
    /// element ends up with a count of 0 or 1, for a multiset with its
    /// multiplicity.
    pub fn net_counts(&self) -> BTreeMap<i32, isize> {
        let mut counts = BTreeMap::new();

        for event in self.events.lock().iter() {
            match *event {
                Event::Add { elem, result: true } => *counts.entry(elem).or_insert(0) += 1,
                Event::Remove { elem, result: true } => *counts.entry(elem).or_insert(0) -= 1,
                _ => {}
            }
        }

        counts.retain(|_, n| *n != 0);
        counts
    }

    /// Replays the history in order against a [`SequentialSet`].
    pub fn replay_set(&self) -> Result<SequentialSet, Divergence> {
        let mut set = SequentialSet::new();

        self.replay(|event| match event {
            Event::Add { elem, .. } => Some(Event::Add {
                elem,
                result: set.add(elem),
            }),
            Event::Remove { elem, .. } => Some(Event::Remove {
                elem,
                result: set.remove(elem),
            }),
            Event::Contains { elem, .. } => Some(Event::Contains {
                elem,
                result: set.contains(elem),
            }),
            _ => None,
        })?;

        Ok(set)
    }

    /// Replays the history in order against a [`SequentialMultiset`].
    pub fn replay_multiset(&self) -> Result<SequentialMultiset, Divergence> {
        let mut multiset = SequentialMultiset::new();

        self.replay(|event| match event {
            Event::Add { elem, .. } => Some(Event::Add {
                elem,
                result: multiset.add(elem),
            }),
            Event::Remove { elem, .. } => Some(Event::Remove {
                elem,
                result: multiset.remove(elem),
            }),
            Event::Count { elem, .. } => Some(Event::Count {
                elem,
                result: multiset.count(elem),
            }),
            _ => None,
        })?;

        Ok(multiset)
    }

    /// Replays the history in order against a plain vector used as a stack.
    /// Returns the remaining elements, bottom first.
    pub fn replay_stack(&self) -> Result<Vec<i32>, Divergence> {
        let mut stack = Vec::new();

        self.replay(|event| match event {
            Event::Push { elem } => {
                stack.push(elem);
                Some(event)
            }
            Event::Pop { .. } => Some(Event::Pop {
                result: stack.pop(),
            }),
            Event::Size { .. } => Some(Event::Size {
                result: stack.len(),
            }),
            _ => None,
        })?;

        Ok(stack)
    }

    fn replay(&self, mut apply: impl FnMut(Event) -> Option<Event>) -> Result<(), Divergence> {
        for (index, &recorded) in self.events.lock().iter().enumerate() {
            let Some(expected) = apply(recorded) else {
                continue;
            };

            if expected != recorded {
                tracing::debug!(index, %recorded, %expected, "history diverges from sequential replay");
                return Err(Divergence {
                    index,
                    recorded,
                    expected,
                });
            }
        }

        Ok(())
    }
}
