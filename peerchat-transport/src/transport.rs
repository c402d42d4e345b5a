//! Line transport over one connected TCP stream.
//!
//! # Framing Invariants
//!
//! - One message = one `\n`-terminated line. No length prefix, no escaping.
//! - Each `send_line()` writes the whole line and flushes before returning.
//! - Each `receive_line()` yields exactly one line, terminator stripped.
//! - The read and write directions are independent; after `into_split()`
//!   each one is driven by a single owner with no lock between them.

use std::net::SocketAddr;

use peerchat_core::line::{decode_line, encode_line, LINE_TERMINATOR, MAX_LINE_BYTES};
use peerchat_core::OutgoingMessage;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::TransportError;

// One byte past the limit tells an overlong line from a full one
const READ_LIMIT: u64 = MAX_LINE_BYTES as u64 + 1;

/// An open duplex line channel to the peer.
///
/// Does not implement `Clone`: exactly one owner per direction.
#[derive(Debug)]
pub struct Transport {
    reader: LineReader,
    writer: LineWriter,
    peer: Option<SocketAddr>,
}

impl Transport {
    /// Wrap an already-connected stream.
    pub fn open(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        debug!(?peer, "transport opened");
        Self {
            reader: LineReader {
                inner: Some(BufReader::new(read_half)),
                buf: Vec::new(),
            },
            writer: LineWriter {
                inner: Some(write_half),
            },
            peer,
        }
    }

    /// Remote address, if the OS could still report it when opened.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Whether `close()` has not been called yet.
    pub fn is_open(&self) -> bool {
        self.writer.is_open()
    }

    /// Write `text` followed by a newline and flush.
    pub async fn send_line(&mut self, text: &str) -> Result<(), TransportError> {
        self.writer.write_wire(&encode_line(text)).await
    }

    /// Wait for the next line. `None` means the peer closed gracefully.
    pub async fn receive_line(&mut self) -> Result<Option<String>, TransportError> {
        self.reader.receive_line().await
    }

    /// Release the stream. Idempotent.
    ///
    /// The peer observes end-of-stream, and both halves of the socket are
    /// dropped so the OS releases it.
    pub async fn close(&mut self) {
        self.reader.close();
        self.writer.close().await;
    }

    /// Separate the receive and send directions.
    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}

/// Receive direction of a [`Transport`].
#[derive(Debug)]
pub struct LineReader {
    inner: Option<BufReader<OwnedReadHalf>>,
    buf: Vec<u8>,
}

impl LineReader {
    /// Wait for the next line. `None` means the peer closed gracefully.
    ///
    /// A final line without terminator is returned before `None`. Lines
    /// longer than [`MAX_LINE_BYTES`] fail with
    /// [`TransportError::LineTooLong`].
    pub async fn receive_line(&mut self) -> Result<Option<String>, TransportError> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(TransportError::Closed);
        };

        self.buf.clear();
        let n = inner
            .take(READ_LIMIT)
            .read_until(LINE_TERMINATOR, &mut self.buf)
            .await
            .map_err(TransportError::Read)?;

        if n == 0 {
            return Ok(None);
        }
        if self.buf.len() > MAX_LINE_BYTES && self.buf.last() != Some(&LINE_TERMINATOR) {
            return Err(TransportError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }

        Ok(Some(decode_line(&self.buf)))
    }

    /// Drop the read half. Idempotent.
    pub fn close(&mut self) {
        self.inner = None;
    }
}

/// Send direction of a [`Transport`].
#[derive(Debug)]
pub struct LineWriter {
    inner: Option<OwnedWriteHalf>,
}

impl LineWriter {
    /// Put `message` on the wire as one line and flush.
    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<(), TransportError> {
        self.write_wire(&message.to_wire()).await
    }

    async fn write_wire(&mut self, wire: &[u8]) -> Result<(), TransportError> {
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        inner.write_all(wire).await.map_err(TransportError::Write)?;
        inner.flush().await.map_err(TransportError::Write)
    }

    /// Shut down the write direction and drop it. Idempotent.
    ///
    /// The peer observes end-of-stream. The socket itself is released once
    /// the matching [`LineReader`] is gone too.
    pub async fn close(&mut self) {
        let Some(mut inner) = self.inner.take() else {
            return;
        };

        // Best effort: the peer may already be gone
        if let Err(e) = inner.shutdown().await {
            debug!(error = %e, "shutdown after peer loss");
        }
    }

    /// Whether `close()` has not been called yet.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}
