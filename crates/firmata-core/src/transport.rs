//! Transport trait for board communication.
//!
//! The [`Transport`] trait abstracts over the byte link to a board.
//! Implementations exist for serial ports, TCP sockets, arbitrary async
//! streams (`firmata-transport`), and a scripted mock for testing
//! (`firmata-test-harness`).
//!
//! The protocol engine in `firmata-protocol` only ever talks to a
//! `Transport`, so the same code drives real hardware and deterministic
//! unit tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a board.
///
/// Implementations deal with the physical link only. Firmata framing is
/// handled by the frame decoder that consumes the received bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the board.
    ///
    /// Implementations should return once all bytes have been handed to the
    /// underlying link (serial TX buffer, TCP socket, etc.).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the board into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout` for
    /// data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline. Callers polling a board treat
    /// a timeout as "no data available".
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
