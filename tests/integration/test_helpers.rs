//! Shared test helpers for relay integration tests.
//!
//! Provides a relay bound to an ephemeral loopback port, a line-oriented
//! TCP client, and in-memory session plumbing so individual test modules
//! can focus on behaviour rather than boilerplate.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use command_relay::relay::codec::{LineReader, LineWriter, RelayCodec};
use command_relay::relay::{RelayContext, RelayListener};

/// Upper bound for any single wait in these tests.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Window used to assert that nothing arrives.
pub const QUIET_WINDOW: Duration = Duration::from_millis(150);

/// A relay listening on `127.0.0.1:<ephemeral>`.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub ctx: Arc<RelayContext>,
    pub ct: CancellationToken,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestRelay {
    /// Stop the accept loop and every session.
    pub async fn shutdown(self) {
        self.ct.cancel();
        tokio::time::timeout(STEP_TIMEOUT, self.handle)
            .await
            .expect("listener stops")
            .expect("listener task");
    }
}

/// Start a relay with the given queue capacity.
pub async fn start_relay(queue_capacity: usize) -> TestRelay {
    let listener = RelayListener::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr();
    let ctx = Arc::new(RelayContext::new(queue_capacity, 1024));
    let ct = CancellationToken::new();
    let handle = listener.spawn(Arc::clone(&ctx), ct.clone());
    TestRelay {
        addr,
        ctx,
        ct,
        handle,
    }
}

/// Poll `condition` until it holds or [`STEP_TIMEOUT`] elapses.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Await `fut`, failing the test if it takes longer than [`STEP_TIMEOUT`].
pub async fn within<T>(what: &str, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(STEP_TIMEOUT, fut)
        .await
        .unwrap_or_else(|_| panic!("timed out: {what}"))
}

/// Line-oriented TCP client speaking the relay protocol.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to relay");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Connect and register as consumer, waiting until the relay admits it.
    pub async fn consumer(relay: &TestRelay) -> Self {
        let mut client = Self::connect(relay.addr).await;
        client.send("GET_COMMANDS").await;
        let slot = relay.ctx.slot.clone();
        wait_until("consumer is admitted", || slot.is_occupied()).await;
        client
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write line");
    }

    /// Send a command as producer and assert it is acknowledged.
    pub async fn send_command(&mut self, command: &str) {
        self.send(command).await;
        assert_eq!(
            self.recv().await.as_deref(),
            Some("0"),
            "command {command:?} must be acknowledged"
        );
    }

    /// Next line, or `None` at end of stream.
    pub async fn recv(&mut self) -> Option<String> {
        within("reading a line", self.lines.next_line())
            .await
            .expect("read line")
    }

    /// Assert that no line arrives within [`QUIET_WINDOW`].
    pub async fn expect_silence(&mut self) {
        if let Ok(result) = tokio::time::timeout(QUIET_WINDOW, self.lines.next_line()).await {
            panic!("expected silence, got {result:?}");
        }
    }

    /// Assert that the relay closed the connection.
    pub async fn expect_closed(&mut self) {
        match within("connection close", self.lines.next_line()).await {
            Ok(None) | Err(_) => {}
            Ok(Some(line)) => panic!("expected close, got line {line:?}"),
        }
    }

    /// Close the write side, signalling end of stream to the relay.
    pub async fn finish(&mut self) {
        self.writer.shutdown().await.expect("shutdown write side");
    }
}

/// Server side of an in-memory connection, framed the way the relay frames it.
pub struct ServerEnd {
    pub lines: LineReader<ReadHalf<DuplexStream>>,
    pub writer: LineWriter<WriteHalf<DuplexStream>>,
}

/// Client side of an in-memory connection.
pub struct ClientEnd {
    pub lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    pub writer: WriteHalf<DuplexStream>,
}

impl ClientEnd {
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write line");
    }

    pub async fn recv(&mut self) -> Option<String> {
        within("reading a line", self.lines.next_line())
            .await
            .expect("read line")
    }

    pub async fn expect_silence(&mut self) {
        if let Ok(result) = tokio::time::timeout(QUIET_WINDOW, self.lines.next_line()).await {
            panic!("expected silence, got {result:?}");
        }
    }
}

/// An in-memory connection with the server end already framed.
pub fn duplex_pair(max_line_bytes: usize) -> (ClientEnd, ServerEnd) {
    duplex_pair_with_buffer(max_line_bytes, 64 * 1024)
}

/// Like [`duplex_pair`], but each direction buffers at most `buffer` bytes
/// before writes block.
pub fn duplex_pair_with_buffer(max_line_bytes: usize, buffer: usize) -> (ClientEnd, ServerEnd) {
    let (client, server) = tokio::io::duplex(buffer);
    let (server_read, server_write) = tokio::io::split(server);
    let (client_read, client_write) = tokio::io::split(client);
    (
        ClientEnd {
            lines: BufReader::new(client_read).lines(),
            writer: client_write,
        },
        ServerEnd {
            lines: FramedRead::new(server_read, RelayCodec::new(max_line_bytes)),
            writer: FramedWrite::new(server_write, RelayCodec::new(max_line_bytes)),
        },
    )
}
