//! Producer session: read commands, enqueue them, acknowledge each.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::queue::CommandQueue;
use crate::relay::codec::{shutdown_writer, LineReader, LineWriter};
use crate::relay::{ACK, PING};
use crate::Result;

/// Run a producer session until the peer closes, an error occurs, or
/// shutdown begins.
///
/// `first_command` is the negotiation line and is handled exactly like
/// every later line. `PING` lines are skipped without acknowledgement.
/// Any other line is pushed onto `queue`, waiting while the queue is full,
/// and then acknowledged with `0`.
///
/// The connection is closed on every exit path.
///
/// # Errors
///
/// Returns the read, write, or queue error that ended the session.
pub async fn run_producer<R, W>(
    first_command: String,
    mut lines: LineReader<R>,
    mut writer: LineWriter<W>,
    queue: &CommandQueue,
    ct: &CancellationToken,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending = Some(first_command);
    let mut inserted: u64 = 0;

    let outcome = loop {
        let line = if let Some(line) = pending.take() {
            line
        } else {
            let item = tokio::select! {
                biased;
                () = ct.cancelled() => break Ok(()),
                item = lines.next() => item,
            };
            match item {
                None => break Ok(()),
                Some(Ok(line)) => line,
                Some(Err(err)) => break Err(err),
            }
        };

        if line == PING {
            trace!("producer ping");
            continue;
        }

        debug!(command = %line, "inserting command");
        let pushed = tokio::select! {
            biased;
            () = ct.cancelled() => break Ok(()),
            pushed = queue.push(line) => pushed,
        };
        if let Err(err) = pushed {
            break Err(err);
        }

        let acked = tokio::select! {
            biased;
            () = ct.cancelled() => break Ok(()),
            acked = writer.send(ACK.to_owned()) => acked,
        };
        if let Err(err) = acked {
            break Err(err);
        }
        inserted += 1;
    };

    shutdown_writer(writer).await;
    drop(lines);

    match outcome {
        Ok(()) => {
            info!(inserted, "producer disconnected");
            Ok(inserted)
        }
        Err(err) => {
            warn!(%err, inserted, "producer session failed");
            Err(err)
        }
    }
}
