#![no_main]

use libfuzzer_sys::fuzz_target;
use linkset::{Event, History, Operation, Stack, TreiberStack};
use std::sync::Arc;

fuzz_target!(|ops: Vec<Operation>| {
    let history = Arc::new(History::new());
    let stack = Arc::new(TreiberStack::with_recorder(history.clone()));

    let mut threads = vec![];

    let len = ops.len();

    for sub_ops in ops.chunks(std::cmp::max(len / 20, 1)) {
        let sub_ops = sub_ops.to_vec();
        let stack = stack.clone();

        threads.push(std::thread::spawn(move || {
            sub_ops.into_iter().for_each(|op| match op {
                Operation::Push { elem } | Operation::Add { elem } => {
                    stack.push(elem);
                }
                Operation::Pop | Operation::Remove { .. } => {
                    stack.pop();
                }
                Operation::Size | Operation::Contains { .. } => {
                    stack.size();
                }
            })
        }))
    }

    for thread in threads {
        thread.join().unwrap()
    }

    let events = history.events();
    let pushed = events
        .iter()
        .filter(|e| matches!(e, Event::Push { .. }))
        .count();
    let popped = events
        .iter()
        .filter(|e| matches!(e, Event::Pop { result: Some(_) }))
        .count();

    assert_eq!(stack.size(), pushed - popped);
});
