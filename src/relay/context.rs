//! Shared state handed to every connection.

use crate::config::RelayConfig;
use crate::queue::CommandQueue;
use crate::relay::codec::RelayCodec;
use crate::slot::ConsumerSlot;

/// Queue, consumer slot, and line framing shared by all sessions.
///
/// Constructed once at startup and passed to the listener behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RelayContext {
    /// Commands waiting for the consumer.
    pub queue: CommandQueue,
    /// Single-consumer admission gate.
    pub slot: ConsumerSlot,
    codec: RelayCodec,
}

impl RelayContext {
    /// Build a context with an empty queue of `queue_capacity` and a free slot.
    #[must_use]
    pub fn new(queue_capacity: usize, max_line_bytes: usize) -> Self {
        Self {
            queue: CommandQueue::new(queue_capacity),
            slot: ConsumerSlot::new(),
            codec: RelayCodec::new(max_line_bytes),
        }
    }

    /// Build a context sized from `config`.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.queue_capacity, config.max_line_bytes)
    }

    /// Longest accepted inbound line.
    #[must_use]
    pub fn max_line_bytes(&self) -> usize {
        self.codec.max_line_bytes()
    }

    /// Fresh codec honouring the configured line limit.
    #[must_use]
    pub fn codec(&self) -> RelayCodec {
        self.codec.clone()
    }
}
