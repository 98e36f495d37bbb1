//! Synthetic producer for demos without real clients.
//!
//! Inserts each configured command after a fixed delay, exactly as a
//! producer session would, including waiting while the queue is full.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::queue::CommandQueue;

/// Spawn the demo producer. The task resolves to the number of commands
/// inserted before it finished or `cancel` fired.
#[must_use]
pub fn spawn_demo_producer(
    config: DemoConfig,
    queue: CommandQueue,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<usize> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(config.interval_seconds);
        let mut inserted = 0;

        for command in config.commands {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }

            let pushed = tokio::select! {
                () = cancel.cancelled() => break,
                pushed = queue.push(command.clone()) => pushed,
            };
            match pushed {
                Ok(()) => {
                    info!(command = %command, "demo command inserted");
                    inserted += 1;
                }
                Err(err) => {
                    warn!(%err, "could not insert demo command");
                    break;
                }
            }
        }

        info!(inserted, "demo producer finished");
        inserted
    })
}
