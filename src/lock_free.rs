use crate::hazard::{self, Hazard};
use crate::{Event, MaybeTagged, Recorder, Set, Unmonitored, HEAD_KEY, TAIL_KEY};
use core::ptr::{null_mut, NonNull};
use core::sync::atomic::Ordering;

struct Node {
    key: i64,
    /// Successor, tagged once this node is logically deleted.
    next: MaybeTagged<Node>,
}

impl Node {
    fn new(key: i64, next: *mut Node) -> *mut Self {
        Box::into_raw(Box::new(Node {
            key,
            next: MaybeTagged::new(next),
        }))
    }
}

/// Two adjacent nodes returned by [`LockFreeSet::find`], both protected.
struct Window {
    pred: *mut Node,
    curr: *mut Node,
    hp_pred: Hazard,
    hp_curr: Hazard,
}

impl Window {
    fn new() -> Self {
        Window {
            pred: null_mut(),
            curr: null_mut(),
            hp_pred: hazard::hazard(),
            hp_curr: hazard::hazard(),
        }
    }

    fn pred(&self) -> &Node {
        unsafe { &*self.pred }
    }

    fn curr(&self) -> &Node {
        unsafe { &*self.curr }
    }
}

/// Lock-free sorted list set (Harris–Michael).
///
/// A node is deleted by tagging its own `next` word, which freezes that word:
/// nothing can be linked after a deleted node, and the single CAS that
/// unlinks it expects an untagged predecessor.
pub struct LockFreeSet<R = Unmonitored> {
    head: NonNull<Node>,
    recorder: R,
}

unsafe impl<R: Send> Send for LockFreeSet<R> {}
unsafe impl<R: Sync> Sync for LockFreeSet<R> {}

impl LockFreeSet {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for LockFreeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> LockFreeSet<R> {
    pub fn with_recorder(recorder: R) -> Self {
        let tail = Node::new(TAIL_KEY, null_mut());
        let head = Node::new(HEAD_KEY, tail);

        LockFreeSet {
            head: unsafe { NonNull::new_unchecked(head) },
            recorder,
        }
    }

    /// Positions `window` on adjacent nodes with `pred.key < key <= curr.key`,
    /// `pred` unmarked and pointing at `curr` when last looked at.
    ///
    /// Deleted nodes met on the way are snipped out and retired. A failed
    /// snip re-reads `pred` instead of trusting what it saw; the walk only
    /// restarts from the head when `pred` itself got deleted.
    fn find(&self, window: &mut Window, key: i64) {
        'retry: loop {
            let mut pred = self.head.as_ptr();
            let mut curr = unsafe { (*pred).next.load_ptr() };

            loop {
                hazard::protect(&mut window.hp_curr, curr);

                match unsafe { (*pred).next.load(Ordering::Acquire) } {
                    (now, false) if now == curr => {}
                    (now, false) => {
                        curr = now;
                        continue;
                    }
                    (_, true) => continue 'retry,
                }

                // `curr` was linked after it got protected
                let (succ, deleted) = unsafe { (*curr).next.load(Ordering::Acquire) };

                if deleted {
                    let snip = unsafe {
                        (*pred).next.compare_exchange_tagged(
                            (curr, false),
                            (succ, false),
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                    };

                    match snip {
                        Ok(_) => {
                            unsafe { hazard::retire(curr) };
                            curr = succ;
                        }
                        Err((now, false)) => {
                            tracing::trace!(key, "snip lost a race, re-reading predecessor");
                            curr = now;
                        }
                        Err((_, true)) => {
                            tracing::trace!(key, "predecessor deleted during snip, restarting");
                            continue 'retry;
                        }
                    }
                    continue;
                }

                if unsafe { (*curr).key } >= key {
                    window.pred = pred;
                    window.curr = curr;
                    return;
                }

                pred = curr;
                core::mem::swap(&mut window.hp_pred, &mut window.hp_curr);
                curr = succ;
            }
        }
    }
}

impl<R: Recorder> Set for LockFreeSet<R> {
    fn add(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut window = Window::new();
        let node = Node::new(key, null_mut());

        loop {
            self.find(&mut window, key);

            if window.curr().key == key {
                unsafe { drop(Box::from_raw(node)) };

                self.recorder.record(Event::Add { elem, result: false });
                return false;
            }

            unsafe { (*node).next.store_ptr(window.curr) };

            let linked = window
                .pred()
                .next
                .compare_exchange(window.curr, node, Ordering::AcqRel, Ordering::Acquire);

            if linked.is_ok() {
                self.recorder.record(Event::Add { elem, result: true });
                return true;
            }

            tracing::trace!(key, "insert CAS failed, retrying");
        }
    }

    fn remove(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut window = Window::new();

        loop {
            self.find(&mut window, key);

            if window.curr().key != key {
                self.recorder.record(Event::Remove { elem, result: false });
                return false;
            }

            let (succ, deleted) = window.curr().next.load(Ordering::Acquire);

            // somebody else got there first; the next find snips it
            if deleted || !window.curr().next.try_tag(succ) {
                tracing::trace!(key, "mark CAS failed, retrying");
                continue;
            }

            self.recorder.record(Event::Remove { elem, result: true });

            let unlinked = window
                .pred()
                .next
                .compare_exchange(window.curr, succ, Ordering::AcqRel, Ordering::Acquire);

            match unlinked {
                Ok(_) => unsafe { hazard::retire(window.curr) },
                // leave it to a walk that can see where it is now
                Err(_) => self.find(&mut window, key),
            }

            return true;
        }
    }

    /// Walks with the same `find` as the writers, so it may unlink marked
    /// nodes on the way. The set's contents never change.
    fn contains(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut window = Window::new();

        self.find(&mut window, key);

        let result = window.curr().key == key;
        self.recorder.record(Event::Contains { elem, result });
        result
    }

    fn to_vec(&mut self) -> Vec<i32> {
        let mut elems = vec![];

        unsafe {
            let mut curr = self.head.as_ref().next.load_ptr();

            while (*curr).key != TAIL_KEY {
                if !(*curr).next.is_tagged() {
                    elems.push((*curr).key as i32);
                }
                curr = (*curr).next.load_ptr();
            }
        }

        elems
    }
}

impl<R> Drop for LockFreeSet<R> {
    fn drop(&mut self) {
        // marked nodes that were never snipped are still linked and ours
        let mut curr = self.head.as_ptr();
        let mut freed = 0usize;

        unsafe {
            while !curr.is_null() {
                let next = (*curr).next.load_ptr();
                drop(Box::from_raw(curr));
                curr = next;
                freed += 1;
            }
        }

        tracing::debug!(freed, "dropped lock-free set");
    }
}
