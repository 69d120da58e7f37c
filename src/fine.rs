use crate::{Event, Recorder, Set, Unmonitored, HEAD_KEY, TAIL_KEY};
use core::marker::PhantomData;
use core::ptr::{null_mut, NonNull};
use core::sync::atomic::{AtomicPtr, Ordering};
use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

pub(crate) struct Node {
    pub(crate) key: i64,
    // written only while `lock` is held
    next: AtomicPtr<Node>,
    lock: RawMutex,
}

impl Node {
    fn new(key: i64, next: *mut Node) -> *mut Self {
        Box::into_raw(Box::new(Node {
            key,
            next: AtomicPtr::new(next),
            lock: RawMutex::INIT,
        }))
    }
}

/// Sentinel-bounded sorted list locked hand-over-hand.
///
/// A thread holds at most two node locks, always predecessor before
/// successor, so traversals cannot deadlock and cannot overtake each other.
pub(crate) struct LockCoupled {
    head: NonNull<Node>,
}

unsafe impl Send for LockCoupled {}
unsafe impl Sync for LockCoupled {}

/// Two adjacent nodes, both locked. Unlocks them on drop.
pub(crate) struct Window<'a> {
    pred: NonNull<Node>,
    curr: NonNull<Node>,
    _list: PhantomData<&'a LockCoupled>,
}

impl<'a> Window<'a> {
    fn pred(&self) -> &Node {
        unsafe { self.pred.as_ref() }
    }

    fn curr(&self) -> &Node {
        unsafe { self.curr.as_ref() }
    }

    pub(crate) fn curr_key(&self) -> i64 {
        self.curr().key
    }

    /// Links a new node for `key` between the two locked nodes.
    pub(crate) fn insert(&self, key: i64) {
        debug_assert!(self.pred().key <= key && key <= self.curr().key);

        let node = Node::new(key, self.curr.as_ptr());
        self.pred().next.store(node, Ordering::Release);
    }

    /// Unlinks and frees the current node, releasing both locks.
    ///
    /// Anyone who could reach the node would have to hold the predecessor's
    /// lock first, so it is freed right away.
    pub(crate) fn unlink(self) {
        debug_assert!(self.curr().key != HEAD_KEY && self.curr().key != TAIL_KEY);

        let removed = self.curr.as_ptr();
        self.pred()
            .next
            .store(self.curr().next.load(Ordering::Acquire), Ordering::Release);

        drop(self);

        unsafe {
            drop(Box::from_raw(removed));
        }
    }

    /// Counts the consecutive nodes keyed `key`, starting at the current
    /// node.
    ///
    /// The predecessor is released and the current node stays locked until
    /// the returned [`Run`] is dropped. Every add or remove of `key` has to
    /// lock that node, so the run holds still while it is counted. A second
    /// lock steps through the rest of the run and covers each node while its
    /// successor's key is read.
    pub(crate) fn count_run(self, key: i64) -> Run<'a> {
        let (pred, first) = (self.pred, self.curr);
        core::mem::forget(self);

        let mut run = Run {
            first,
            len: 0,
            _list: PhantomData,
        };

        unsafe {
            pred.as_ref().lock.unlock();

            if first.as_ref().key != key {
                return run;
            }

            run.len = 1;
            let mut curr = first;

            loop {
                let next = curr.as_ref().next.load(Ordering::Acquire);
                let next_key = (*next).key;

                if curr != first {
                    curr.as_ref().lock.unlock();
                }

                if next_key != key {
                    break;
                }

                // past the first node, run nodes are only freed by removals
                // that must take `first` before them
                let next = NonNull::new_unchecked(next);
                next.as_ref().lock.lock();

                run.len += 1;
                curr = next;
            }
        }

        run
    }

    /// Slides the window one node to the right: locks the next node, then
    /// releases the predecessor.
    pub(crate) fn advance(self) -> Self {
        let next = self.curr().next.load(Ordering::Acquire);
        debug_assert!(!next.is_null(), "advanced past the tail sentinel");

        let (pred, curr) = (self.pred, self.curr);
        core::mem::forget(self);

        unsafe {
            let next = NonNull::new_unchecked(next);
            next.as_ref().lock.lock();
            pred.as_ref().lock.unlock();

            Window {
                pred: curr,
                curr: next,
                _list: PhantomData,
            }
        }
    }
}

/// A counted run whose first node is still locked.
pub(crate) struct Run<'a> {
    first: NonNull<Node>,
    len: usize,
    _list: PhantomData<&'a LockCoupled>,
}

impl<'a> Run<'a> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<'a> Drop for Run<'a> {
    fn drop(&mut self) {
        unsafe { self.first.as_ref().lock.unlock() }
    }
}

impl<'a> Drop for Window<'a> {
    fn drop(&mut self) {
        unsafe {
            self.curr().lock.unlock();
            self.pred().lock.unlock();
        }
    }
}

impl LockCoupled {
    pub(crate) fn new() -> Self {
        let tail = Node::new(TAIL_KEY, null_mut());
        let head = Node::new(HEAD_KEY, tail);

        LockCoupled {
            head: unsafe { NonNull::new_unchecked(head) },
        }
    }

    /// Locks its way down to the first node whose key is `>= key`.
    pub(crate) fn window(&self, key: i64) -> Window<'_> {
        unsafe {
            self.head.as_ref().lock.lock();

            let curr = NonNull::new_unchecked(self.head.as_ref().next.load(Ordering::Acquire));
            curr.as_ref().lock.lock();

            let mut window = Window {
                pred: self.head,
                curr,
                _list: PhantomData,
            };

            while window.curr_key() < key {
                window = window.advance();
            }

            window
        }
    }

    /// Keys between the sentinels. Needs no locks: `&mut self` rules out
    /// every other thread.
    pub(crate) fn keys(&mut self) -> Vec<i64> {
        let mut keys = vec![];

        unsafe {
            let mut curr = self.head.as_ref().next.load(Ordering::Relaxed);

            while (*curr).key != TAIL_KEY {
                keys.push((*curr).key);
                curr = (*curr).next.load(Ordering::Relaxed);
            }
        }

        keys
    }
}

impl Drop for LockCoupled {
    fn drop(&mut self) {
        let mut curr = self.head.as_ptr();
        let mut freed = 0usize;

        unsafe {
            while !curr.is_null() {
                let next = (*curr).next.load(Ordering::Relaxed);
                drop(Box::from_raw(curr));
                curr = next;
                freed += 1;
            }
        }

        tracing::debug!(freed, "dropped lock-coupled list");
    }
}

/// A set locked hand-over-hand.
pub struct FineSet<R = Unmonitored> {
    list: LockCoupled,
    recorder: R,
}

impl FineSet {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for FineSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> FineSet<R> {
    pub fn with_recorder(recorder: R) -> Self {
        FineSet {
            list: LockCoupled::new(),
            recorder,
        }
    }
}

impl<R: Recorder> Set for FineSet<R> {
    fn add(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let window = self.list.window(key);

        let result = window.curr_key() != key;
        if result {
            window.insert(key);
        }

        self.recorder.record(Event::Add { elem, result });
        result
    }

    fn remove(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let window = self.list.window(key);

        let result = window.curr_key() == key;
        self.recorder.record(Event::Remove { elem, result });

        if result {
            window.unlink();
        }

        result
    }

    fn contains(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let window = self.list.window(key);

        let result = window.curr_key() == key;
        self.recorder.record(Event::Contains { elem, result });
        result
    }

    fn to_vec(&mut self) -> Vec<i32> {
        self.list.keys().into_iter().map(|key| key as i32).collect()
    }
}
