//! Role negotiation on a freshly accepted connection.
//!
//! The first line decides the peer's role. `GET_COMMANDS` asks for the
//! consumer slot; anything else makes the peer a producer whose first
//! command is that same line.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::relay::codec::shutdown_writer;
use crate::relay::context::RelayContext;
use crate::relay::{consumer, producer, GET_COMMANDS};
use crate::Result;

/// Role claimed by a connection's first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Peer asked to drain the queue.
    Consumer,
    /// Peer submits commands; `first_command` is the line already read.
    Producer {
        /// Negotiation line, processed as the first command.
        first_command: String,
    },
}

impl Role {
    /// Classify a connection by its first line.
    #[must_use]
    pub fn from_first_line(line: String) -> Self {
        if line == GET_COMMANDS {
            Self::Consumer
        } else {
            Self::Producer {
                first_command: line,
            }
        }
    }
}

/// How a negotiated connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stream closed (or shutdown began) before the first line arrived.
    ClosedBeforeRole,
    /// Consumer candidate turned away because the slot was occupied.
    ConsumerRejected,
    /// A consumer session ran and ended.
    Consumer(consumer::ConsumerReport),
    /// A producer session ran; `inserted` commands were enqueued.
    Producer {
        /// Commands enqueued and acknowledged.
        inserted: u64,
    },
}

/// Read the first line from `stream` and run the matching session.
///
/// The stream is closed on every exit path, including the rejection of a
/// second consumer.
///
/// # Errors
///
/// Returns the I/O or framing error that ended the session early. Such
/// errors never affect other connections.
pub async fn negotiate<S>(
    stream: S,
    ctx: &RelayContext,
    ct: &CancellationToken,
) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut lines = FramedRead::new(read_half, ctx.codec());
    let mut writer = FramedWrite::new(write_half, ctx.codec());

    let first = tokio::select! {
        biased;
        () = ct.cancelled() => None,
        item = lines.next() => item,
    };

    let line = match first {
        None => {
            info!("connection closed before role negotiation");
            shutdown_writer(writer).await;
            return Ok(Outcome::ClosedBeforeRole);
        }
        Some(Err(err)) => {
            shutdown_writer(writer).await;
            return Err(err);
        }
        Some(Ok(line)) => line,
    };

    match Role::from_first_line(line) {
        Role::Consumer => {
            let Some(guard) = ctx.slot.try_acquire() else {
                warn!("consumer rejected: another consumer is already connected");
                shutdown_writer(writer).await;
                return Ok(Outcome::ConsumerRejected);
            };
            info!(session = guard.session(), "consumer connected");
            let report = consumer::run_consumer(
                lines,
                writer,
                ctx.queue.clone(),
                ctx.slot.clone(),
                guard,
                ct,
            )
            .await;
            Ok(Outcome::Consumer(report))
        }
        Role::Producer { first_command } => {
            info!("producer connected");
            let inserted =
                producer::run_producer(first_command, lines, writer, &ctx.queue, ct).await?;
            Ok(Outcome::Producer { inserted })
        }
    }
}
