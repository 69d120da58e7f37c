use crate::fine::LockCoupled;
use crate::{Event, Multiset, Recorder, Unmonitored};

/// A multiset locked hand-over-hand. Equal elements are adjacent.
pub struct FineMultiset<R = Unmonitored> {
    list: LockCoupled,
    recorder: R,
}

impl FineMultiset {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for FineMultiset {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> FineMultiset<R> {
    pub fn with_recorder(recorder: R) -> Self {
        FineMultiset {
            list: LockCoupled::new(),
            recorder,
        }
    }
}

impl<R: Recorder> Multiset for FineMultiset<R> {
    fn add(&self, elem: i32) -> bool {
        let key = i64::from(elem);
        let window = self.list.window(key);

        window.insert(key);

        self.recorder.record(Event::Add { elem, result: true });
        true
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

    /// Rolls the two-lock window up to the run of `elem`s, then counts the
    /// run while its first node stays locked, which freezes the run.
    fn count(&self, elem: i32) -> usize {
        let key = i64::from(elem);
        let run = self.list.window(key).count_run(key);

        let result = run.len();

        self.recorder.record(Event::Count { elem, result });
        result
    }

    fn to_vec(&mut self) -> Vec<i32> {
        self.list.keys().into_iter().map(|key| key as i32).collect()
    }
}
