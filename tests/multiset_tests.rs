use linkset::{FineMultiset, History, Multiset, SequentialMultiset};
use rand::Rng;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

#[test]
fn repeats_are_counted() {
    let mut multiset = FineMultiset::new();

    assert!(multiset.add(5));
    assert!(multiset.add(5));
    assert!(multiset.add(3));

    assert_eq!(multiset.count(5), 2);
    assert_eq!(multiset.count(3), 1);
    assert_eq!(multiset.count(4), 0);

    assert!(multiset.remove(5));
    assert_eq!(multiset.count(5), 1);
    assert!(multiset.remove(5));
    assert!(!multiset.remove(5));

    assert_eq!(multiset.to_vec(), vec![3]);
}

#[rstest]
#[case::negative(-7)]
#[case::zero(0)]
#[case::min(i32::MIN)]
#[case::max(i32::MAX)]
fn any_element_round_trips(#[case] elem: i32) {
    let mut multiset = FineMultiset::new();

    for _ in 0..3 {
        multiset.add(elem);
    }

    assert_eq!(multiset.count(elem), 3);
    assert_eq!(multiset.to_vec(), vec![elem; 3]);
}

#[test]
fn agrees_with_sequential_model() {
    let mut multiset = FineMultiset::new();
    let mut model = SequentialMultiset::new();
    let mut rng = rand::thread_rng();

    for _ in 0..5_000 {
        let elem = rng.gen_range(-8..8);

        match rng.gen_range(0..3) {
            0 => assert_eq!(multiset.add(elem), model.add(elem)),
            1 => assert_eq!(multiset.remove(elem), model.remove(elem)),
            _ => assert_eq!(multiset.count(elem), model.count(elem)),
        }
    }

    assert_eq!(multiset.to_vec(), model.iter().collect::<Vec<_>>());
}

#[test]
fn concurrent_history_replays() {
    let history = Arc::new(History::new());
    let multiset = Arc::new(FineMultiset::with_recorder(history.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let multiset = Arc::clone(&multiset);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();

                for _ in 0..1_000 {
                    let elem = rng.gen_range(0..8);
                    match rng.gen_range(0..3) {
                        0 => {
                            multiset.add(elem);
                        }
                        1 => {
                            multiset.remove(elem);
                        }
                        _ => {
                            multiset.count(elem);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let replayed = history.replay_multiset().unwrap();
    let mut multiset = Arc::try_unwrap(multiset).ok().unwrap();
    assert_eq!(multiset.to_vec(), replayed.iter().collect::<Vec<_>>());
}
