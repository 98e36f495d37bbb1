//! Bounded, ordered command queue shared by every session.
//!
//! Producers insert with [`CommandQueue::push`], which waits while the queue
//! is full. The active consumer's pusher removes with [`CommandQueue::pop`],
//! which waits while the queue is empty. Both are cancel-safe: dropping a
//! pending call neither loses nor duplicates a command.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::{AppError, Result};

/// Largest capacity a queue can be created with.
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Process-wide FIFO of command lines with fixed capacity.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<String>,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl CommandQueue {
    /// Create an empty queue holding at most `capacity` commands.
    ///
    /// `capacity` is clamped to `1..=MAX_QUEUE_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_QUEUE_CAPACITY));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Append `command`, waiting for free space while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QueueClosed` if the receiving side was dropped.
    pub async fn push(&self, command: String) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| AppError::QueueClosed("receiver dropped".into()))
    }

    /// Remove the oldest command, waiting while the queue is empty.
    ///
    /// Only one caller removes at a time; concurrent callers wait their turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QueueClosed` if every sender was dropped.
    pub async fn pop(&self) -> Result<String> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| AppError::QueueClosed("all senders dropped".into()))
    }

    /// Number of commands currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Whether no command is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of commands the queue holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}
