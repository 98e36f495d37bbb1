//! TCP relay between producers and the single consumer.
//!
//! Every accepted connection announces its role with its first line:
//!
//! | Sender            | Line              | Effect                                  |
//! |-------------------|-------------------|-----------------------------------------|
//! | any peer          | `GET_COMMANDS`    | becomes the consumer if the slot is free |
//! | producer          | `PING`            | ignored, not acknowledged               |
//! | producer          | anything else     | enqueued, acknowledged with `0`         |
//! | server → consumer | command text      | one dequeued command per line           |
//! | consumer          | `QUIT`            | ends the consumer session               |
//! | consumer          | anything else     | ignored (liveness only)                 |
//!
//! The first line of a producer is itself a command.

pub mod codec;
pub mod consumer;
pub mod context;
pub mod listener;
pub mod producer;
pub mod role;

pub use context::RelayContext;
pub use listener::RelayListener;

/// First line requesting the consumer role.
pub const GET_COMMANDS: &str = "GET_COMMANDS";

/// Producer liveness check.
pub const PING: &str = "PING";

/// Consumer request to end its session.
pub const QUIT: &str = "QUIT";

/// Acknowledgement written to a producer after each enqueued command.
pub const ACK: &str = "0";
