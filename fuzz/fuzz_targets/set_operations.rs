#![no_main]

use libfuzzer_sys::fuzz_target;
use linkset::{History, LazySet, LockFreeSet, Operation, Set};
use std::sync::Arc;

fn run<S: Set + 'static>(set: S, ops: &[Operation]) -> S {
    let set = Arc::new(set);

    let mut threads = vec![];

    for sub_ops in ops.chunks(std::cmp::max(ops.len() / 8, 1)) {
        let sub_ops = sub_ops.to_vec();
        let set = set.clone();

        threads.push(std::thread::spawn(move || {
            sub_ops.into_iter().for_each(|op| match op {
                Operation::Add { elem } | Operation::Push { elem } => {
                    set.add(elem);
                }
                Operation::Remove { elem } => {
                    set.remove(elem);
                }
                Operation::Contains { elem } => {
                    set.contains(elem);
                }
                Operation::Pop | Operation::Size => {}
            })
        }))
    }

    for thread in threads {
        thread.join().unwrap()
    }

    match Arc::try_unwrap(set) {
        Ok(set) => set,
        Err(_) => panic!("worker still holds the set"),
    }
}

fn check(mut set: impl Set, history: &History) {
    let counts = history.net_counts();

    assert!(counts.values().all(|&n| n == 1));
    assert_eq!(set.to_vec(), counts.keys().copied().collect::<Vec<_>>());
}

fuzz_target!(|ops: Vec<Operation>| {
    let history = Arc::new(History::new());
    let set = run(LockFreeSet::with_recorder(history.clone()), &ops);
    check(set, &history);

    let history = Arc::new(History::new());
    let set = run(LazySet::with_recorder(history.clone()), &ops);
    check(set, &history);
});
