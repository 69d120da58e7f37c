use crate::hazard::{self, Hazard};
use crate::{Event, Recorder, Set, Unmonitored, HEAD_KEY, TAIL_KEY};
use core::ptr::{null_mut, NonNull};
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

/// Node of a list that is searched without locks and changed under them.
pub(crate) struct Node {
    pub(crate) key: i64,
    pub(crate) next: AtomicPtr<Node>,
    lock: RawMutex,
    /// Set before the node is unlinked, while it and its predecessor are
    /// locked. Never cleared.
    marked: AtomicBool,
}

impl Node {
    pub(crate) fn new(key: i64, next: *mut Node) -> *mut Self {
        Box::into_raw(Box::new(Node {
            key,
            next: AtomicPtr::new(next),
            lock: RawMutex::INIT,
            marked: AtomicBool::new(false),
        }))
    }

    pub(crate) fn lock(&self) -> Locked<'_> {
        self.lock.lock();
        Locked(self)
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    pub(crate) fn mark(&self) {
        self.marked.store(true, Ordering::Release);
    }
}

pub(crate) struct Locked<'a>(&'a Node);

impl<'a> Drop for Locked<'a> {
    fn drop(&mut self) {
        unsafe { self.0.lock.unlock() }
    }
}

/// Sentinel-bounded sorted chain of [`Node`]s.
pub(crate) struct Chain {
    head: NonNull<Node>,
}

unsafe impl Send for Chain {}
unsafe impl Sync for Chain {}

impl Chain {
    pub(crate) fn new() -> Self {
        let tail = Node::new(TAIL_KEY, null_mut());
        let head = Node::new(HEAD_KEY, tail);

        Chain {
            head: unsafe { NonNull::new_unchecked(head) },
        }
    }

    pub(crate) fn head(&self) -> *mut Node {
        self.head.as_ptr()
    }

    /// Linked keys between the sentinels.
    pub(crate) fn keys(&mut self) -> Vec<i64> {
        let mut keys = vec![];

        unsafe {
            let mut curr = self.head.as_ref().next.load(Ordering::Acquire);

            while (*curr).key != TAIL_KEY {
                keys.push((*curr).key);
                curr = (*curr).next.load(Ordering::Acquire);
            }
        }

        keys
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        // unlinked nodes belong to the hazard domain, everything still
        // linked is ours
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

        tracing::debug!(freed, "dropped chain");
    }
}

/// A protected position in a [`Chain`]: two adjacent nodes, `pred` and
/// `curr`, both covered by hazard pointers so neither is freed while the
/// cursor sits on them.
pub(crate) struct Cursor {
    pred: *mut Node,
    curr: *mut Node,
    hp_pred: Hazard,
    hp_curr: Hazard,
}

impl Cursor {
    pub(crate) fn new() -> Self {
        Cursor {
            pred: null_mut(),
            curr: null_mut(),
            hp_pred: hazard::hazard(),
            hp_curr: hazard::hazard(),
        }
    }

    /// Walks from `head` without locks until `pred.key < key <= curr.key`.
    ///
    /// A step onto `curr` only counts once `pred` is seen unmarked and still
    /// pointing at `curr`: then `curr` was linked after it got protected, so
    /// it cannot have been retired. A marked `pred` sends the walk back to
    /// the head.
    pub(crate) fn find(&mut self, head: *mut Node, key: i64) {
        'retry: loop {
            let mut pred = head;
            let mut curr = unsafe { (*pred).next.load(Ordering::Acquire) };

            loop {
                hazard::protect(&mut self.hp_curr, curr);

                let pred_ref = unsafe { &*pred };

                if pred_ref.is_marked() {
                    tracing::trace!(key, "predecessor unlinked under the walk, restarting");
                    continue 'retry;
                }

                let now = pred_ref.next.load(Ordering::Acquire);
                if now != curr {
                    curr = now;
                    continue;
                }

                if unsafe { (*curr).key } >= key {
                    self.pred = pred;
                    self.curr = curr;
                    return;
                }

                pred = curr;
                core::mem::swap(&mut self.hp_pred, &mut self.hp_curr);
                curr = unsafe { (*pred).next.load(Ordering::Acquire) };
            }
        }
    }

    pub(crate) fn pred(&self) -> &Node {
        debug_assert!(!self.pred.is_null());
        unsafe { &*self.pred }
    }

    pub(crate) fn curr(&self) -> &Node {
        debug_assert!(!self.curr.is_null());
        unsafe { &*self.curr }
    }

    pub(crate) fn curr_ptr(&self) -> *mut Node {
        self.curr
    }

    /// Locks `pred`, then `curr`.
    pub(crate) fn lock(&self) -> (Locked<'_>, Locked<'_>) {
        let pred = self.pred().lock();
        let curr = self.curr().lock();
        (pred, curr)
    }

    /// Links a fresh node for `key` between `pred` and `curr`. Both must be
    /// locked and validated.
    pub(crate) fn insert(&self, key: i64) {
        let node = Node::new(key, self.curr);
        self.pred().next.store(node, Ordering::Release);
    }

    /// Marks `curr` and unlinks it. Both nodes must be locked and validated;
    /// the caller retires `curr` once the locks are released.
    pub(crate) fn unlink(&self) {
        let curr = self.curr();
        curr.mark();
        self.pred()
            .next
            .store(curr.next.load(Ordering::Acquire), Ordering::Release);
    }
}

/// A set that searches without locks, then locks the two nodes it needs and
/// re-walks from the head to check they are still linked and adjacent.
pub struct OptimisticSet<R = Unmonitored> {
    chain: Chain,
    recorder: R,
}

impl OptimisticSet {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for OptimisticSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> OptimisticSet<R> {
    pub fn with_recorder(recorder: R) -> Self {
        OptimisticSet {
            chain: Chain::new(),
            recorder,
        }
    }

    /// Whether `pred` is still reachable and still points at `curr`.
    fn validate(&self, check: &mut Cursor, found: &Cursor) -> bool {
        check.find(self.chain.head(), found.curr().key);

        let valid = core::ptr::eq(check.pred, found.pred) && core::ptr::eq(check.curr, found.curr);
        if !valid {
            tracing::trace!(key = found.curr().key, "optimistic validation failed, retrying");
        }
        valid
    }
}

impl<R: Recorder> Set for OptimisticSet<R> {
    fn add(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();
        let mut check = Cursor::new();

        loop {
            cursor.find(self.chain.head(), key);
            let _locks = cursor.lock();

            if !self.validate(&mut check, &cursor) {
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

    fn remove(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();
        let mut check = Cursor::new();

        loop {
            cursor.find(self.chain.head(), key);
            let locks = cursor.lock();

            if !self.validate(&mut check, &cursor) {
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

    fn contains(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let mut cursor = Cursor::new();
        let mut check = Cursor::new();

        loop {
            cursor.find(self.chain.head(), key);
            let _locks = cursor.lock();

            if !self.validate(&mut check, &cursor) {
                continue;
            }

            let result = cursor.curr().key == key;
            self.recorder.record(Event::Contains { elem, result });
            return result;
        }
    }

    fn to_vec(&mut self) -> Vec<i32> {
        self.chain.keys().into_iter().map(|key| key as i32).collect()
    }
}
