//! Transport over any asynchronous byte stream.
//!
//! [`StreamTransport`] implements the [`Transport`] trait for anything that
//! is `AsyncRead + AsyncWrite`: a serial port, a TCP socket, a Unix socket,
//! or an in-memory duplex pipe. [`SerialTransport`](crate::SerialTransport)
//! and [`TcpTransport`](crate::TcpTransport) are aliases of it with their
//! own constructors; [`wrap`](crate::wrap) adopts an already-open stream.
//!
//! # Example
//!
//! ```no_run
//! use firmata_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! // A board bridged over a TCP serial server (e.g. ser2net).
//! let socket = tokio::net::TcpStream::connect("localhost:8023").await?;
//! let mut transport = firmata_transport::wrap(socket);
//!
//! // REPORT_VERSION
//! transport.send(&[0xF9]).await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_millis(100)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use firmata_core::error::{Error, Result};
use firmata_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// [`Transport`] implementation over an async byte stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    /// The underlying stream, `None` after `close()` is called.
    stream: Option<S>,
    /// Label for logging (port name, peer address, ...).
    label: String,
    /// Whether a zero-length read means the peer went away.
    eof_is_disconnect: bool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    /// Wrap an already-open stream.
    ///
    /// A zero-length read is reported as [`Error::ConnectionLost`], which is
    /// what end-of-stream means for sockets and pipes.
    pub fn new(stream: S, label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!(label = %label, "Wrapping existing stream");
        Self {
            stream: Some(stream),
            label,
            eof_is_disconnect: true,
        }
    }

    /// Treat zero-length reads as "no data yet" instead of a disconnect.
    ///
    /// Serial drivers may complete a read with zero bytes while the line is
    /// still up.
    pub(crate) fn with_eof_as_idle(mut self) -> Self {
        self.eof_is_disconnect = false;
        self
    }

    /// The label this transport logs under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Take back the underlying stream, if the transport is still open.
    pub fn into_inner(mut self) -> Option<S> {
        self.stream.take()
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            label = %self.label,
            bytes = data.len(),
            data = ?data,
            "Sending data"
        );

        stream.write_all(data).await.map_err(|e| {
            tracing::error!(label = %self.label, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        stream.flush().await.map_err(|e| {
            tracing::error!(label = %self.label, error = %e, "Failed to flush stream");
            map_io_error(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let result = tokio::time::timeout(timeout, stream.read(buf)).await;

        match result {
            Ok(Ok(0)) if self.eof_is_disconnect && !buf.is_empty() => {
                tracing::warn!(label = %self.label, "Peer closed stream (0 bytes read)");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(
                    label = %self.label,
                    bytes = n,
                    data = ?&buf[..n],
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(label = %self.label, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    label = %self.label,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(label = %self.label, "Closing stream");

            if let Err(e) = stream.flush().await {
                tracing::warn!(
                    label = %self.label,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            if let Err(e) = stream.shutdown().await {
                tracing::warn!(
                    label = %self.label,
                    error = %e,
                    "Failed to shut down stream (continuing anyway)"
                );
            }

            tracing::info!(label = %self.label, "Stream closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S> Drop for StreamTransport<S> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            tracing::debug!(label = %self.label, "Transport dropped while open");
        }
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
pub(crate) fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
