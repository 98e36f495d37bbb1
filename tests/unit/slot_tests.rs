//! Unit tests for consumer slot admission control.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use command_relay::slot::ConsumerSlot;

#[test]
fn new_slot_is_free() {
    let slot = ConsumerSlot::new();
    assert!(!slot.is_occupied());
}

#[test]
fn acquire_marks_slot_occupied() {
    let slot = ConsumerSlot::new();
    let guard = slot.try_acquire().expect("free slot is acquired");

    assert!(slot.is_occupied());
    assert!(slot.is_held_by(guard.session()));
}

#[test]
fn second_acquire_is_rejected_while_occupied() {
    let slot = ConsumerSlot::new();
    let _guard = slot.try_acquire().expect("first acquire");

    assert!(slot.try_acquire().is_none(), "only one consumer at a time");
}

#[test]
fn release_frees_slot_for_next_consumer() {
    let slot = ConsumerSlot::new();
    let first = slot.try_acquire().expect("first acquire");
    let first_session = first.session();
    first.release();

    assert!(!slot.is_occupied());
    let second = slot.try_acquire().expect("slot is free again");
    assert_ne!(second.session(), first_session, "sessions get fresh ids");
    assert!(!slot.is_held_by(first_session));
}

#[test]
fn dropping_guard_frees_slot() {
    let slot = ConsumerSlot::new();
    {
        let _guard = slot.try_acquire().expect("acquire");
    }
    assert!(!slot.is_occupied());
}

#[test]
fn clones_share_one_slot() {
    let slot = ConsumerSlot::new();
    let other = slot.clone();
    let _guard = slot.try_acquire().expect("acquire");

    assert!(other.is_occupied());
    assert!(other.try_acquire().is_none());
}

#[test]
fn concurrent_acquires_admit_exactly_one() {
    let slot = ConsumerSlot::new();
    let admitted = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(std::sync::Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let slot = slot.clone();
            let admitted = Arc::clone(&admitted);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let guard = slot.try_acquire();
                if guard.is_some() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
                // Hold the guard until every thread has tried.
                barrier.wait();
                drop(guard);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread");
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert!(!slot.is_occupied());
}
