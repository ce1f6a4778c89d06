//! BoardBuilder -- fluent builder for constructing [`Board`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial parameters, handshake timing and decoder limits before the
//! transport is opened. Building does not talk to the board; call
//! [`Board::connect`] afterwards to run the handshake.
//!
//! # Example
//!
//! ```no_run
//! use firmata_protocol::BoardBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! let mut board = BoardBuilder::new()
//!     .serial_port("/dev/ttyACM0")
//!     .baud_rate(57_600)
//!     .handshake_timeout(Duration::from_secs(3))
//!     .build()
//!     .await?;
//! board.connect().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use firmata_core::{Error, Result, Transport};
use tokio::sync::broadcast;

use crate::board::{Board, BoardConfig};
use crate::constants::{DEFAULT_MAX_SYSEX_LEN, MAX_PORTS};
use crate::state::BoardState;

/// Fewest digital ports enabled for reporting after the handshake.
const MIN_REPORT_PORTS: u8 = 2;

/// Shortest sysex frame: start, sub-command, end.
const MIN_SYSEX_LEN: usize = 3;

/// Fluent builder for [`Board`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let board = BoardBuilder::new().serial_port("/dev/ttyACM0").build().await?;
/// ```
#[derive(Debug, Clone)]
pub struct BoardBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    poll_interval: Duration,
    handshake_timeout: Duration,
    max_retries: u32,
    report_ports: u8,
    max_sysex_len: usize,
    event_capacity: usize,
}

impl Default for BoardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardBuilder {
    pub fn new() -> Self {
        BoardBuilder {
            serial_port: None,
            baud_rate: firmata_transport::DEFAULT_BAUD_RATE,
            poll_interval: Duration::from_millis(100),
            handshake_timeout: Duration::from_secs(2),
            max_retries: 3,
            report_ports: MIN_REPORT_PORTS,
            max_sysex_len: DEFAULT_MAX_SYSEX_LEN,
            event_capacity: 256,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Serial baud rate (default: 57600, what StandardFirmata uses).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// How long each transport read waits for data (default: 100ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long one handshake step may wait for its answer (default: 2s).
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// How many times a handshake query is resent before giving up
    /// (default: 3).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Digital ports to enable reporting on once ready (2-16, default: 2).
    pub fn report_ports(mut self, ports: u8) -> Self {
        self.report_ports = ports;
        self
    }

    /// Longest accepted sysex frame in bytes (default: 4096).
    pub fn max_sysex_len(mut self, len: usize) -> Self {
        self.max_sysex_len = len;
        self
    }

    /// Capacity of the broadcast channel behind [`Board::subscribe`]
    /// (default: 256). Slow subscribers past this many events lag.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(MIN_REPORT_PORTS..=MAX_PORTS).contains(&self.report_ports) {
            return Err(Error::InvalidParameter(format!(
                "report_ports must be between {MIN_REPORT_PORTS} and {MAX_PORTS}, got {}",
                self.report_ports
            )));
        }
        if self.max_sysex_len < MIN_SYSEX_LEN {
            return Err(Error::InvalidParameter(format!(
                "max_sysex_len must be at least {MIN_SYSEX_LEN}"
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidParameter(
                "event_capacity must be non-zero".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidParameter(
                "poll_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Build a [`Board`] with a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `firmata-test-harness`) and for TCP or wrapped-stream transports.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Board> {
        self.validate()?;

        let (event_tx, _) = broadcast::channel(self.event_capacity);
        let config = BoardConfig {
            poll_interval: self.poll_interval,
            handshake_timeout: self.handshake_timeout,
            max_retries: self.max_retries,
            report_ports: self.report_ports,
        };

        Ok(Board::new(
            transport,
            BoardState::with_max_sysex_len(self.max_sysex_len),
            event_tx,
            config,
        ))
    }

    /// Build a [`Board`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<Board> {
        self.validate()?;
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = firmata_transport::open_serial(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
