use crate::hazard;
use crate::optimistic::{Chain, Cursor};
use crate::{Event, Recorder, Set, Unmonitored};
use core::sync::atomic::Ordering;

/// A set with logical deletion.
///
/// Writers lock the two nodes around the element and validate them locally:
/// both unmarked and still adjacent. Removal marks the node before unlinking
/// it, and `contains` takes no locks at all, trusting the mark.
pub struct LazySet<R = Unmonitored> {
    chain: Chain,
    recorder: R,
}

impl LazySet {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for LazySet {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(cursor: &Cursor) -> bool {
    let (pred, curr) = (cursor.pred(), cursor.curr());

    let valid = !pred.is_marked()
        && !curr.is_marked()
        && core::ptr::eq(pred.next.load(Ordering::Acquire), cursor.curr_ptr());

    if !valid {
        tracing::trace!(key = curr.key, "lazy validation failed, retrying");
    }
    valid
}

impl<R: Recorder> LazySet<R> {
    pub fn with_recorder(recorder: R) -> Self {
        LazySet {
            chain: Chain::new(),
            recorder,
        }
    }
}

impl<R: Recorder> Set for LazySet<R> {
    fn add(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();

        loop {
            cursor.find(self.chain.head(), key);
            let _locks = cursor.lock();

            if !validate(&cursor) {
                continue;
            }

            let result = cursor.curr().key != key;
            if result {
                cursor.insert(key);
            }

            self.recorder.record(Event::Add { elem, result });
            return result;
        }
    }

    /// Marking the node is what removes it; the unlink right after only
    /// tidies up.
    fn remove(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();

        loop {
            cursor.find(self.chain.head(), key);
            let locks = cursor.lock();

            if !validate(&cursor) {
                continue;
            }

            let result = cursor.curr().key == key;
            if result {
                cursor.unlink();
            }

            self.recorder.record(Event::Remove { elem, result });
            drop(locks);

            if result {
                unsafe { hazard::retire(cursor.curr_ptr()) };
            }
            return result;
        }
    }

    /// Takes no locks. The walk only restarts when its predecessor gets
    /// marked, and never unlinks anything.
    fn contains(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();

        cursor.find(self.chain.head(), key);

        let curr = cursor.curr();
        let result = curr.key == key && !curr.is_marked();

        self.recorder.record(Event::Contains { elem, result });
        result
    }

    fn to_vec(&mut self) -> Vec<i32> {
        self.chain.keys().into_iter().map(|key| key as i32).collect()
    }
}
