use crate::hazard::{self, protect, protect_slot};
use crate::{Event, MaybeTagged, Recorder, Stack, Unmonitored};
use core::sync::atomic::Ordering;

struct Node {
    val: i32,
    next: MaybeTagged<Self>,
}

impl Node {
    fn new(val: i32) -> *mut Self {
        Box::into_raw(Box::new(Node {
            val,
            next: MaybeTagged::null(),
        }))
    }
}

/// Treiber's lock-free stack.
///
/// A node is only ever pushed once, so while a popper's hazard pointer covers
/// the top node, seeing that same pointer still on top means nothing below
/// it has changed either.
pub struct TreiberStack<R = Unmonitored> {
    head: MaybeTagged<Node>,
    recorder: R,
}

impl TreiberStack {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for TreiberStack {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> TreiberStack<R> {
    pub fn with_recorder(recorder: R) -> Self {
        TreiberStack {
            head: MaybeTagged::null(),
            recorder,
        }
    }

    /// The top element, left in place.
    pub fn peek(&self) -> Option<i32> {
        let mut hazard = hazard::hazard();
        let top = protect_slot(&mut hazard, &self.head);

        if top.is_null() {
            None
        } else {
            Some(unsafe { (*top).val })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.load_ptr().is_null()
    }
}

impl<R: Recorder> Stack for TreiberStack<R> {
    fn push(&self, val: i32) -> bool {
        let node_ptr = Node::new(val);
        let node = unsafe { &*node_ptr };

        let mut head_ptr = self.head.load_ptr();

        node.next.store_ptr(head_ptr);

        while let Err((now, _)) =
            self.head
                .compare_exchange(head_ptr, node_ptr, Ordering::AcqRel, Ordering::Relaxed)
        {
            node.next.store_ptr(now);
            head_ptr = now;
        }

        self.recorder.record(Event::Push { elem: val });
        true
    }

    fn pop(&self) -> Option<i32> {
        let mut hazard = hazard::hazard();

        loop {
            let old_head = protect_slot(&mut hazard, &self.head);

            if old_head.is_null() {
                self.recorder.record(Event::Pop { result: None });
                return None;
            }

            let next_ptr = unsafe { (*old_head).next.load_ptr() };

            if self
                .head
                .compare_exchange(old_head, next_ptr, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let val = unsafe { (*old_head).val };
                self.recorder.record(Event::Pop { result: Some(val) });

                unsafe { hazard::retire(old_head) };
                hazard::reclaim();

                return Some(val);
            }

            tracing::trace!("pop CAS failed, retrying");
        }
    }

    /// Counts the nodes below a snapshot of the top, starting over whenever
    /// the top moves, so the count is the size the stack had at the last
    /// check.
    fn size(&self) -> usize {
        let mut hp_top = hazard::hazard();
        let mut hp_prev = hazard::hazard();
        let mut hp_curr = hazard::hazard();

        'retry: loop {
            let top = protect_slot(&mut hp_top, &self.head);

            if top.is_null() {
                self.recorder.record(Event::Size { result: 0 });
                return 0;
            }

            let mut count = 1;
            let mut curr = top;

            loop {
                let next = unsafe { (*curr).next.load_ptr() };

                if next.is_null() {
                    break;
                }

                protect(&mut hp_curr, next);

                if self.head.load_ptr() != top {
                    tracing::trace!("top moved while counting, restarting");
                    continue 'retry;
                }

                count += 1;
                curr = next;
                core::mem::swap(&mut hp_prev, &mut hp_curr);
            }

            self.recorder.record(Event::Size { result: count });
            return count;
        }
    }
}

impl<R> Drop for TreiberStack<R> {
    fn drop(&mut self) {
        let mut curr = self.head.load_ptr();

        unsafe {
            while !curr.is_null() {
                let next = (*curr).next.load_ptr();
                drop(Box::from_raw(curr));
                curr = next;
            }
        }
    }
}
