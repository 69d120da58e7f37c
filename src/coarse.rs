use crate::{Event, Recorder, SequentialSet, Set, Unmonitored};
use parking_lot::Mutex;

/// A set behind a single lock.
///
/// Every operation holds the lock for its whole duration, so operations are
/// totally ordered by lock acquisition.
pub struct CoarseSet<R = Unmonitored> {
    list: Mutex<SequentialSet>,
    recorder: R,
}

impl CoarseSet {
    pub fn new() -> Self {
        Self::with_recorder(Unmonitored)
    }
}

impl Default for CoarseSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Recorder> CoarseSet<R> {
    pub fn with_recorder(recorder: R) -> Self {
        CoarseSet {
            list: Mutex::new(SequentialSet::new()),
            recorder,
        }
    }

    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Recorder> Set for CoarseSet<R> {
    fn add(&self, elem: i32) -> bool {
        let mut list = self.list.lock();
        let result = list.add(elem);
        self.recorder.record(Event::Add { elem, result });
        result
    }

    fn remove(&self, elem: i32) -> bool {
        let mut list = self.list.lock();
        let result = list.remove(elem);
        self.recorder.record(Event::Remove { elem, result });
        result
    }

    fn contains(&self, elem: i32) -> bool {
        let list = self.list.lock();
        let result = list.contains(elem);
        self.recorder.record(Event::Contains { elem, result });
        result
    }

    fn to_vec(&mut self) -> Vec<i32> {
        self.list.get_mut().iter().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::History;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_history_replays() {
        let history = Arc::new(History::new());
        let set = Arc::new(CoarseSet::with_recorder(history.clone()));

        let mut threads = vec![];

        for _ in 0..8 {
            let set = set.clone();

            threads.push(thread::spawn(move || {
                for _ in 0..500 {
                    let elem = rand::random::<i32>() % 16;
                    match rand::random::<u8>() % 3 {
                        0 => set.add(elem),
                        1 => set.remove(elem),
                        _ => set.contains(elem),
                    };
                }
            }))
        }

        for thread in threads {
            thread.join().unwrap();
        }

        // events are recorded under the lock, so their order is a linearization
        let replayed = history.replay_set().unwrap();
        let mut set = Arc::try_unwrap(set).ok().unwrap();
        assert_eq!(set.to_vec(), replayed.iter().collect::<Vec<_>>());
        assert_eq!(history.len(), 8 * 500);
    }
}
