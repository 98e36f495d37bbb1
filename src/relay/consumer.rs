//! Consumer session: a pusher and a reader sharing one connection.
//!
//! The pusher moves commands from the queue to the consumer while the slot
//! is held by this session. The reader discards inbound lines until `QUIT`,
//! end of stream, or an error, then releases the slot. A session-scoped
//! cancellation token links the halves: the reader cancels it when it
//! exits, the pusher cancels it when a write fails, and each half closes
//! its own side of the connection.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::queue::CommandQueue;
use crate::relay::codec::{shutdown_writer, LineReader, LineWriter};
use crate::relay::QUIT;
use crate::slot::{ConsumerSlot, SlotGuard};

/// Why the reader half stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerExit {
    /// Consumer sent `QUIT`.
    Quit,
    /// Consumer closed the connection.
    Disconnected,
    /// Reading failed; carries the error text.
    ReadFailed(String),
    /// The pusher stopped first (write failure) or shutdown began.
    Cancelled,
}

/// Summary of a finished consumer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Session id assigned at admission.
    pub session: u64,
    /// Reason the reader half stopped.
    pub exit: ConsumerExit,
    /// Commands written to the consumer.
    pub pushed: u64,
}

/// Run both halves of a consumer session to completion.
///
/// The pusher runs as its own task; the reader runs on the caller's task.
/// The slot is released as soon as the reader stops, before the pusher has
/// necessarily finished, so a new consumer may be admitted immediately.
pub async fn run_consumer<R, W>(
    lines: LineReader<R>,
    writer: LineWriter<W>,
    queue: CommandQueue,
    slot: ConsumerSlot,
    guard: SlotGuard,
    ct: &CancellationToken,
) -> ConsumerReport
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let session = guard.session();
    let span = info_span!("consumer", session);
    let session_ct = ct.child_token();

    let pusher = tokio::spawn(
        run_pusher(session, writer, queue, slot, session_ct.clone()).instrument(span.clone()),
    );

    let exit = run_reader(lines, &session_ct).instrument(span.clone()).await;

    // The slot must be free before the pusher closes the socket.
    guard.release();
    session_ct.cancel();

    let pushed = match pusher.await {
        Ok(pushed) => pushed,
        Err(err) => {
            warn!(parent: &span, %err, "pusher task panicked");
            0
        }
    };

    info!(parent: &span, ?exit, pushed, "consumer gone");
    ConsumerReport {
        session,
        exit,
        pushed,
    }
}

/// Write queued commands to the consumer until the slot changes hands,
/// `session_ct` fires, or a write fails.
///
/// A command already removed from the queue when the session ends is not
/// returned to it.
async fn run_pusher<W>(
    session: u64,
    mut writer: LineWriter<W>,
    queue: CommandQueue,
    slot: ConsumerSlot,
    session_ct: CancellationToken,
) -> u64
where
    W: AsyncWrite + Unpin,
{
    let mut pushed: u64 = 0;

    while slot.is_held_by(session) {
        let command = tokio::select! {
            biased;
            () = session_ct.cancelled() => break,
            popped = queue.pop() => match popped {
                Ok(command) => command,
                Err(err) => {
                    warn!(%err, "pusher cannot read queue");
                    break;
                }
            },
        };

        debug!(command = %command, "pushing command to consumer");
        let sent = tokio::select! {
            biased;
            () = session_ct.cancelled() => break,
            sent = writer.send(command) => sent,
        };
        if let Err(err) = sent {
            warn!(%err, "write to consumer failed");
            break;
        }
        pushed += 1;
    }

    session_ct.cancel();
    shutdown_writer(writer).await;
    debug!(pushed, "pusher stopped");
    pushed
}

/// Discard consumer lines until `QUIT`, end of stream, error, or
/// cancellation. Drops the read side on return.
async fn run_reader<R>(mut lines: LineReader<R>, session_ct: &CancellationToken) -> ConsumerExit
where
    R: AsyncRead + Unpin,
{
    info!("waiting for consumer lines");
    loop {
        let item = tokio::select! {
            biased;
            () = session_ct.cancelled() => return ConsumerExit::Cancelled,
            item = lines.next() => item,
        };

        match item {
            None => return ConsumerExit::Disconnected,
            Some(Ok(line)) if line == QUIT => return ConsumerExit::Quit,
            Some(Ok(line)) => debug!(line = %line, "consumer sent line"),
            Some(Err(err)) => {
                warn!(%err, "connection with consumer interrupted");
                return ConsumerExit::ReadFailed(err.to_string());
            }
        }
    }
}
