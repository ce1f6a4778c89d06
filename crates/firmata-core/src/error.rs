//! Error types for the Firmata host client.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, protocol decode
//! problems, pin registry misuse, and handshake timeouts are all captured
//! here.

use crate::types::ConnectionState;

/// The error type for all Firmata operations.
///
/// Variants fall into three groups:
///
/// - **Non-fatal stream conditions** ([`Protocol`](Error::Protocol),
///   [`UnknownCommand`](Error::UnknownCommand)) are reported by the frame
///   decoder next to the decoded events. The decoder keeps running.
/// - **Caller errors** ([`OutOfRangePin`](Error::OutOfRangePin),
///   [`StalePin`](Error::StalePin), [`InvalidParameter`](Error::InvalidParameter))
///   fail the calling operation only.
/// - **Link errors** (transport, I/O, timeouts) fail the current read or
///   write and are propagated verbatim.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, TCP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// A malformed or truncated frame (e.g. a sysex frame interrupted by a
    /// status byte, or one exceeding the maximum sysex length).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A leading byte that does not start any known message.
    #[error("unknown command byte 0x{0:02X}")]
    UnknownCommand(u8),

    /// A pin index that has not been discovered by a capability query.
    #[error("pin {pin} out of range ({count} pins discovered)")]
    OutOfRangePin {
        /// The requested pin index.
        pin: usize,
        /// Number of pins currently in the registry.
        count: usize,
    },

    /// A pin handle taken before the registry was last replaced.
    #[error("stale pin handle for pin {pin} (generation {held}, registry at {current})")]
    StalePin {
        /// Pin index the handle refers to.
        pin: usize,
        /// Generation captured in the handle.
        held: u64,
        /// Current registry generation.
        current: u64,
    },

    /// Timed out waiting for data from the board.
    #[error("timeout waiting for response")]
    Timeout,

    /// The connection handshake did not progress within the configured
    /// timeout and retry budget.
    #[error("handshake timed out in state {state}")]
    HandshakeTimeout {
        /// The state the handshake was stuck in.
        state: ConnectionState,
    },

    /// An invalid parameter was passed to a board command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An event listener reported a failure or panicked.
    #[error("listener failed: {0}")]
    Listener(String),

    /// No connection to the board has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the board was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for conditions the decoder reports but recovers from.
    pub fn is_recoverable_stream_error(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::UnknownCommand(_))
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
