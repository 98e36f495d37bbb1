//! TCP listener for producer and consumer connections.
//!
//! Binds once at startup; a bind failure is fatal. Each accepted connection
//! is negotiated on its own task so a slow peer never stalls the accept
//! loop. There is no limit on concurrent producers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::relay::context::RelayContext;
use crate::relay::role::{self, Outcome};
use crate::{AppError, Result};

/// Bound relay listener.
#[derive(Debug)]
pub struct RelayListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl RelayListener {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Bind` if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| AppError::Bind(format!("cannot listen on {addr}: {err}")))?;
        let addr = listener
            .local_addr()
            .map_err(|err| AppError::Bind(format!("cannot resolve local address: {err}")))?;
        Ok(Self { listener, addr })
    }

    /// Address actually bound (resolves port `0`).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Spawn the accept loop as a background task.
    #[must_use]
    pub fn spawn(
        self,
        ctx: Arc<RelayContext>,
        ct: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.serve(ctx, ct))
    }

    /// Accept connections until `ct` is cancelled.
    pub async fn serve(self, ctx: Arc<RelayContext>, ct: CancellationToken) {
        let span = info_span!("relay_listener", addr = %self.addr);
        async move {
            info!(
                queue_capacity = ctx.queue.capacity(),
                max_line_bytes = ctx.max_line_bytes(),
                "waiting for connections"
            );
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("relay listener shutting down");
                        break;
                    }
                    accept_result = self.listener.accept() => {
                        match accept_result {
                            Ok((stream, peer)) => {
                                let ctx = Arc::clone(&ctx);
                                let ct = ct.clone();
                                tokio::spawn(handle_connection(stream, peer, ctx, ct));
                            }
                            Err(err) => {
                                warn!(%err, "relay accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    }
}

/// Negotiate and serve a single connection.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<RelayContext>,
    ct: CancellationToken,
) {
    let span = info_span!("relay_conn", conn_id = %Uuid::new_v4(), %peer);
    async move {
        info!("new client connected");
        if let Err(err) = stream.set_nodelay(true) {
            debug!(%err, "cannot disable nagle");
        }

        match role::negotiate(stream, &ctx, &ct).await {
            Ok(Outcome::ConsumerRejected) => {
                info!("rejected consumer connection closed");
            }
            Ok(outcome) => debug!(?outcome, "connection finished"),
            Err(err) => warn!(%err, "error while talking to client"),
        }

        info!("connection closed");
    }
    .instrument(span)
    .await;
}
