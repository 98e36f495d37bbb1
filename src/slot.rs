//! Consumer slot: admission control for the single active consumer.
//!
//! The slot moves `Free -> Occupied` through an atomic compare-and-set in
//! [`ConsumerSlot::try_acquire`] and back to `Free` when the returned
//! [`SlotGuard`] is released or dropped. A second acquire while occupied
//! fails; there is no waiting list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const FREE: u64 = 0;

#[derive(Debug)]
struct SlotState {
    /// Session id of the current holder, or [`FREE`].
    holder: AtomicU64,
    next_session: AtomicU64,
}

/// Shared exclusivity gate. Cloning yields another handle to the same slot.
#[derive(Debug, Clone)]
pub struct ConsumerSlot {
    state: Arc<SlotState>,
}

impl Default for ConsumerSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerSlot {
    /// Create a free slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(SlotState {
                holder: AtomicU64::new(FREE),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Atomically claim the slot for a new consumer session.
    ///
    /// Returns `None` if another session already holds it.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        let session = self.state.next_session.fetch_add(1, Ordering::Relaxed);
        self.state
            .holder
            .compare_exchange(FREE, session, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard {
                state: Arc::clone(&self.state),
                session,
            })
    }

    /// Whether a consumer currently holds the slot.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.state.holder.load(Ordering::Acquire) != FREE
    }

    /// Whether `session` is the current holder.
    #[must_use]
    pub fn is_held_by(&self, session: u64) -> bool {
        self.state.holder.load(Ordering::Acquire) == session
    }
}

/// Proof of slot ownership. Releases the slot when dropped.
#[derive(Debug)]
pub struct SlotGuard {
    state: Arc<SlotState>,
    session: u64,
}

impl SlotGuard {
    /// Session id assigned at admission.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Release the slot now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // Only clears the slot if this session still holds it.
        let _ = self.state.holder.compare_exchange(
            self.session,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
