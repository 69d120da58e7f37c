use linkset::{
    CoarseSet, FineSet, History, LazySet, LockFreeSet, OptimisticSet, SequentialSet, Set,
};
use rand::Rng;
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

// Trait for type-level parametrization
trait TestSet {
    type SetType: Set + 'static;

    fn monitored(history: Arc<History>) -> Self::SetType;
}

struct UseCoarse;
struct UseFine;
struct UseOptimistic;
struct UseLazy;
struct UseLockFree;

impl TestSet for UseCoarse {
    type SetType = CoarseSet<Arc<History>>;

    fn monitored(history: Arc<History>) -> Self::SetType {
        CoarseSet::with_recorder(history)
    }
}

impl TestSet for UseFine {
    type SetType = FineSet<Arc<History>>;

    fn monitored(history: Arc<History>) -> Self::SetType {
        FineSet::with_recorder(history)
    }
}

impl TestSet for UseOptimistic {
    type SetType = OptimisticSet<Arc<History>>;

    fn monitored(history: Arc<History>) -> Self::SetType {
        OptimisticSet::with_recorder(history)
    }
}

impl TestSet for UseLazy {
    type SetType = LazySet<Arc<History>>;

    fn monitored(history: Arc<History>) -> Self::SetType {
        LazySet::with_recorder(history)
    }
}

impl TestSet for UseLockFree {
    type SetType = LockFreeSet<Arc<History>>;

    fn monitored(history: Arc<History>) -> Self::SetType {
        LockFreeSet::with_recorder(history)
    }
}

fn fresh<T: TestSet>() -> (T::SetType, Arc<History>) {
    let history = Arc::new(History::new());
    (T::monitored(history.clone()), history)
}

#[test]
fn sequential_scenario() {
    let mut set = SequentialSet::new();

    let outcomes = [
        set.add(5),
        set.add(3),
        set.add(5),
        set.contains(3),
        set.remove(3),
        set.contains(3),
        set.remove(3),
    ];

    assert_eq!(outcomes, [true, true, false, true, true, false, false]);
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn scenario<T: TestSet>(#[case] _type: T) {
    let (set, history) = fresh::<T>();

    let outcomes = [
        set.add(5),
        set.add(3),
        set.add(5),
        set.contains(3),
        set.remove(3),
        set.contains(3),
        set.remove(3),
    ];

    assert_eq!(outcomes, [true, true, false, true, true, false, false]);

    // single-threaded, so the history is exact for every variant
    assert_eq!(history.len(), 7);
    let replayed = history.replay_set().unwrap();
    assert_eq!(replayed.iter().collect::<Vec<_>>(), vec![5]);
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn sorted_and_unique<T: TestSet>(#[case] _type: T) {
    let (mut set, _) = fresh::<T>();
    let mut model = BTreeSet::new();
    let mut rng = rand::thread_rng();

    for _ in 0..2_000 {
        let elem = rng.gen_range(-50..50);

        if rng.gen_bool(0.6) {
            assert_eq!(set.add(elem), model.insert(elem));
        } else {
            assert_eq!(set.remove(elem), model.remove(&elem));
        }
    }

    assert_eq!(set.to_vec(), model.into_iter().collect::<Vec<_>>());
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn absent_remove_leaves_set_alone<T: TestSet>(#[case] _type: T) {
    let (mut set, _) = fresh::<T>();

    set.add(1);
    set.add(3);

    assert!(!set.remove(2));
    assert!(!set.remove(i32::MIN));
    assert!(!set.remove(i32::MAX));
    assert_eq!(set.to_vec(), vec![1, 3]);
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn concurrent_add_has_one_winner<T: TestSet>(#[case] _type: T) {
    let num_threads = 8;

    for round in 0..20 {
        let (set, _) = fresh::<T>();
        let set = Arc::new(set);
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let set = Arc::clone(&set);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    set.add(round)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();

        assert_eq!(winners, 1, "round {}", round);
        assert!(set.contains(round));
    }
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn added_elements_are_visible<T: TestSet>(#[case] _type: T) {
    let (set, _) = fresh::<T>();
    let set = Arc::new(set);
    let num_threads = 4;
    let items_per_thread = 250;

    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                for i in 0..items_per_thread {
                    let elem = thread_id * items_per_thread + i;
                    assert!(set.add(elem));
                    assert!(set.contains(elem), "missing {} right after add", elem);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for elem in 0..num_threads * items_per_thread {
        assert!(set.contains(elem), "missing key: {}", elem);
    }
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
#[case::lock_free(UseLockFree)]
fn stress_matches_history<T: TestSet>(#[case] _type: T) {
    let (set, history) = fresh::<T>();
    let set = Arc::new(set);
    let num_threads = 8;

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();

                for _ in 0..1_000 {
                    let elem = rng.gen_range(0..64);
                    match rng.gen_range(0..3) {
                        0 => set.add(elem),
                        1 => set.remove(elem),
                        _ => set.contains(elem),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(history.len(), num_threads * 1_000);

    let counts = history.net_counts();
    assert!(counts.values().all(|&n| n == 1), "element added twice in a row");

    let mut set = Arc::try_unwrap(set).ok().unwrap();
    assert_eq!(set.to_vec(), counts.keys().copied().collect::<Vec<_>>());
}

#[rstest]
#[case::coarse(UseCoarse)]
#[case::fine(UseFine)]
#[case::optimistic(UseOptimistic)]
#[case::lazy(UseLazy)]
fn locked_writers_report_in_order<T: TestSet>(#[case] _type: T) {
    let (set, history) = fresh::<T>();
    let set = Arc::new(set);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let set = Arc::clone(&set);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();

                for _ in 0..1_000 {
                    let elem = rng.gen_range(0..16);
                    if rng.gen_bool(0.5) {
                        set.add(elem);
                    } else {
                        set.remove(elem);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // adds and removes report under their locks, so replaying the history
    // one event at a time reproduces every result
    let replayed = history.replay_set().unwrap();
    let mut set = Arc::try_unwrap(set).ok().unwrap();
    assert_eq!(set.to_vec(), replayed.iter().collect::<Vec<_>>());
}
