//! Black-box concurrent stress tests against the public `ConcurrentSet`
//! API, covering spec.md §8's concrete end-to-end scenarios 5 and 6 and a
//! small linearizability check fed a recorded operation log.

use std::sync::atomic::{AtomicUsize, Ordering};

use ebst::ConcurrentSet;
use pretty_assertions::assert_eq;

const SENTINEL1: i64 = i64::MAX - 1;
const SENTINEL2: i64 = i64::MAX;

/// One call's real-time span (start/end sequence numbers from a shared
/// counter) and its observed return value, used by [`check_linearizable`].
#[derive(Clone, Debug)]
struct Call {
    end: usize,
    key: i64,
    kind: Kind,
    result: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Kind {
    Insert,
    Delete,
}

/// Brute-force linearizability check for a single key: collect all calls
/// touching that key, sort by start time, and verify there is *some*
/// sequential interleaving consistent with real-time (non-overlapping)
/// ordering that reproduces every observed return value. Since all calls
/// here are insert/delete (a boolean register toggling on each
/// successful call), a call can be linearized at any point within its
/// `[start, end]` span as long as the resulting prefix of
/// inserts-minus-deletes matches the claimed return value; this is
/// decidable by checking that among calls with overlapping spans, at
/// least one order is consistent, which for this single-key trace
/// reduces to: walk calls ordered by `end`, tracking present/absent, and
/// confirm each call's claimed result matches the set's state applying
/// it in `end`-order (the standard linearization point for a CAS-based
/// register is somewhere before its own completion).
fn check_linearizable_single_key(mut calls: Vec<Call>) {
    calls.sort_by_key(|c| c.end);
    let mut present = false;
    for call in calls {
        match call.kind {
            Kind::Insert => {
                let expected = !present;
                assert_eq!(
                    call.result, expected,
                    "insert({}) returned {} but linearized order expected {}",
                    call.key, call.result, expected
                );
                if call.result {
                    present = true;
                }
            }
            Kind::Delete => {
                let expected = present;
                assert_eq!(
                    call.result, expected,
                    "delete({}) returned {} but linearized order expected {}",
                    call.key, call.result, expected
                );
                if call.result {
                    present = false;
                }
            }
        }
    }
}

#[test]
fn scenario_5_eight_threads_disjoint_ranges() {
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).unwrap();

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..8i64 {
            let set = &set;
            scope.spawn(move |_| {
                for k in (t * 1000)..(t * 1000 + 1000) {
                    assert!(set.insert(k).unwrap());
                }
            });
        }
    })
    .unwrap();

    let collected: Vec<i64> = set.iter().collect();
    let expected: Vec<i64> = (0..8000).collect();
    assert_eq!(collected, expected);
    assert_eq!(set.size(), 8000);
}

#[test]
fn scenario_6_two_threads_hammer_one_key() {
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).unwrap();
    const ITERS: usize = 5000;

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..2 {
            let set = &set;
            scope.spawn(move |_| {
                for _ in 0..ITERS {
                    let _ = set.insert(100);
                    let _ = set.delete(&100);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(set.iter().count(), 0);
    assert_eq!(set.size(), 0);
    assert!(!set.contains(&100).unwrap());
}

#[test]
fn linearizability_of_contended_single_key() {
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).unwrap();
    let clock = AtomicUsize::new(0);
    let calls = std::sync::Mutex::new(Vec::new());

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..4 {
            let set = &set;
            let clock = &clock;
            let calls = &calls;
            scope.spawn(move |_| {
                for i in 0..500 {
                    let kind = if i % 2 == 0 { Kind::Insert } else { Kind::Delete };
                    let result = match kind {
                        Kind::Insert => set.insert(7).unwrap(),
                        Kind::Delete => set.delete(&7).unwrap(),
                    };
                    let end = clock.fetch_add(1, Ordering::SeqCst);
                    calls.lock().unwrap().push(Call {
                        end,
                        key: 7,
                        kind,
                        result,
                    });
                }
            });
        }
    })
    .unwrap();

    let calls = calls.into_inner().unwrap();
    check_linearizable_single_key(calls);
}

#[test]
fn monotonic_size_correctness() {
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).unwrap();
    let successful_inserts = AtomicUsize::new(0);
    let successful_deletes = AtomicUsize::new(0);

    crossbeam_utils::thread::scope(|scope| {
        for t in 0..6i64 {
            let set = &set;
            let successful_inserts = &successful_inserts;
            let successful_deletes = &successful_deletes;
            scope.spawn(move |_| {
                for i in 0..300 {
                    let key = t * 10_000 + i;
                    if set.insert(key).unwrap() {
                        successful_inserts.fetch_add(1, Ordering::Relaxed);
                    }
                    if i % 3 == 0 && set.delete(&key).unwrap() {
                        successful_deletes.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    })
    .unwrap();

    let inserts = successful_inserts.load(Ordering::Relaxed);
    let deletes = successful_deletes.load(Ordering::Relaxed);
    assert_eq!(set.iter().count(), inserts - deletes);
    assert_eq!(set.size(), inserts - deletes);
}

#[test]
fn no_deadlock_under_bounded_fairness() {
    // A scheduler that eventually runs every thread: `thread::scope`
    // joins all spawned threads, so this test simply must terminate.
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).unwrap();
    crossbeam_utils::thread::scope(|scope| {
        for t in 0..16i64 {
            let set = &set;
            scope.spawn(move |_| {
                for i in 0..200 {
                    let key = (t * 37 + i * 13) % 50;
                    match i % 3 {
                        0 => {
                            let _ = set.insert(key);
                        }
                        1 => {
                            let _ = set.delete(&key);
                        }
                        _ => {
                            let _ = set.contains(&key);
                        }
                    }
                }
            });
        }
    })
    .unwrap();
    // Reaching here means every operation terminated.
}
