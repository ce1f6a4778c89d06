//! Serial port transport for board communication.
//!
//! Most Firmata boards (Arduino Uno/Mega/Leonardo, Teensy, ESP32 running
//! ConfigurableFirmata) enumerate as a USB virtual COM port. StandardFirmata
//! talks at 57600 baud, 8N1.
//!
//! # Example
//!
//! ```no_run
//! use firmata_transport::SerialTransport;
//! use firmata_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 57_600).await?;
//!
//! // REPORT_VERSION
//! transport.send(&[0xF9]).await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use firmata_core::error::{Error, Result};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::stream::StreamTransport;

/// Baud rate used by StandardFirmata.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Serial port configuration.
///
/// Defaults match StandardFirmata: 57600 baud, 8 data bits, 1 stop bit,
/// no parity, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g., 57600, 115200)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (typically None)
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial port transport for board communication.
///
/// A [`StreamTransport`] over a `tokio-serial` stream. Zero-length reads
/// are treated as idle rather than as a disconnect.
pub type SerialTransport = StreamTransport<SerialStream>;

impl StreamTransport<SerialStream> {
    /// Open a serial port with the given baud rate and default settings
    /// (8 data bits, 1 stop bit, no parity, no flow control).
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyACM0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate (StandardFirmata uses 57600)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use firmata_transport::SerialTransport;
    /// # async fn example() -> firmata_core::Result<()> {
    /// let transport = SerialTransport::open("/dev/ttyACM0", 57_600).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use firmata_transport::{SerialTransport, SerialConfig, DataBits, StopBits, Parity, FlowControl};
    /// # async fn example() -> firmata_core::Result<()> {
    /// let config = SerialConfig {
    ///     baud_rate: 115_200,
    ///     data_bits: DataBits::Eight,
    ///     stop_bits: StopBits::One,
    ///     parity: Parity::None,
    ///     flow_control: FlowControl::None,
    /// };
    /// let transport = SerialTransport::open_with_config("/dev/ttyUSB0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            "Opening serial port"
        );

        let serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("Failed to open serial port {}: {}", port, e))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened successfully");

        Ok(StreamTransport::new(serial_stream, port).with_eof_as_idle())
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        self.label()
    }
}
