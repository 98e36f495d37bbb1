//! Line codec for relay connections.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! peer that never sends `\n` cannot make the server buffer without bound.
//! A trailing `\r` is stripped, and a final unterminated line before EOF is
//! still delivered.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::{AppError, Result};

/// Default maximum line length: 1 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576;

/// Inbound line stream over any reader.
pub type LineReader<R> = FramedRead<R, RelayCodec>;

/// Outbound line sink over any writer.
pub type LineWriter<W> = FramedWrite<W, RelayCodec>;

/// Newline-delimited UTF-8 codec with a per-line limit.
#[derive(Debug, Clone)]
pub struct RelayCodec {
    inner: LinesCodec,
    max_line_bytes: usize,
}

impl RelayCodec {
    /// Create a codec rejecting lines longer than `max_line_bytes`.
    #[must_use]
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_line_bytes),
            max_line_bytes,
        }
    }

    /// Configured line limit.
    #[must_use]
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    fn map_error(&self, err: LinesCodecError) -> AppError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => AppError::Protocol(format!(
                "line too long: exceeded {} bytes",
                self.max_line_bytes
            )),
            LinesCodecError::Io(io_err) if io_err.kind() == std::io::ErrorKind::InvalidData => {
                AppError::Protocol(format!("invalid line: {io_err}"))
            }
            LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
        }
    }
}

impl Default for RelayCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl Decoder for RelayCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode(src).map_err(|err| self.map_error(err))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode_eof(src).map_err(|err| self.map_error(err))
    }
}

impl Encoder<String> for RelayCodec {
    type Error = AppError;

    /// Encode `item` as `item\n`. The line limit applies to decoding only.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.inner.encode(item, dst).map_err(|err| self.map_error(err))
    }
}

/// Shut down the write side without flushing buffered lines.
///
/// Anything still buffered is discarded: the peer may have stopped reading,
/// and a flush would then wait forever.
pub async fn shutdown_writer<W>(writer: LineWriter<W>)
where
    W: AsyncWrite + Unpin,
{
    let unsent = writer.write_buffer().len();
    if unsent > 0 {
        debug!(unsent, "discarding unsent bytes");
    }
    let mut raw = writer.into_inner();
    if let Err(err) = raw.shutdown().await {
        debug!(%err, "write side already closed");
    }
}
