//! Transport implementations for the Firmata host client.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](firmata_core::Transport) trait from `firmata-core`:
//!
//! - [`SerialTransport`]: USB virtual COM ports and RS-232 serial lines
//! - [`TcpTransport`]: WiFi/Ethernet firmata and serial-to-TCP bridges
//! - [`StreamTransport`]: any already-open async byte stream
//!
//! The two entry points most callers need are [`open_serial`] and [`wrap`].
//!
//! # Example
//!
//! ```no_run
//! use firmata_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! let mut transport = firmata_transport::open_serial("/dev/ttyACM0", 57_600).await?;
//!
//! // Capability query
//! transport.send(&[0xF0, 0x6B, 0xF7]).await?;
//!
//! let mut buf = [0u8; 512];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;
pub mod stream;
pub mod tcp;

pub use serial::{
    DEFAULT_BAUD_RATE, DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits,
};
pub use stream::StreamTransport;
pub use tcp::TcpTransport;

use firmata_core::Result;
use tokio::io::{AsyncRead, AsyncWrite};

/// Open a serial port at `baud_rate` with 8N1 framing.
pub async fn open_serial(path: &str, baud_rate: u32) -> Result<SerialTransport> {
    SerialTransport::open(path, baud_rate).await
}

/// Adopt an already-open stream (socket, pipe, pty) as a transport.
pub fn wrap<S>(stream: S) -> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    StreamTransport::new(stream, "stream")
}
