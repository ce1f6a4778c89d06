//! Core types shared by the Firmata protocol engine and its callers.
//!
//! These model what the host knows about a board: the pins discovered by a
//! capability query, the modes each pin supports, the protocol version, and
//! where the connection handshake currently stands.

use std::fmt;
use std::str::FromStr;

/// Operating mode of a single pin.
///
/// The numeric codes are the bytes used on the wire by `PIN_MODE` and in
/// capability and pin-state responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinMode {
    /// Digital input.
    Input,
    /// Digital output.
    Output,
    /// Analog input (ADC).
    Analog,
    /// PWM output.
    Pwm,
    /// Servo output.
    Servo,
    /// Shift register interface.
    Shift,
    /// Pin reserved for I2C.
    I2c,
    /// OneWire bus.
    OneWire,
    /// Stepper motor driver.
    Stepper,
    /// Rotary encoder input.
    Encoder,
    /// Pin reserved for a hardware/software serial port.
    Serial,
    /// Digital input with the internal pull-up enabled.
    Pullup,
}

impl PinMode {
    /// Every mode, in wire-code order.
    ///
    /// Capability bitmasks are decoded into supported-mode lists in this
    /// order.
    pub const ALL: [PinMode; 12] = [
        PinMode::Input,
        PinMode::Output,
        PinMode::Analog,
        PinMode::Pwm,
        PinMode::Servo,
        PinMode::Shift,
        PinMode::I2c,
        PinMode::OneWire,
        PinMode::Stepper,
        PinMode::Encoder,
        PinMode::Serial,
        PinMode::Pullup,
    ];

    /// Wire code for this mode.
    pub fn code(self) -> u8 {
        match self {
            PinMode::Input => 0x00,
            PinMode::Output => 0x01,
            PinMode::Analog => 0x02,
            PinMode::Pwm => 0x03,
            PinMode::Servo => 0x04,
            PinMode::Shift => 0x05,
            PinMode::I2c => 0x06,
            PinMode::OneWire => 0x07,
            PinMode::Stepper => 0x08,
            PinMode::Encoder => 0x09,
            PinMode::Serial => 0x0A,
            PinMode::Pullup => 0x0B,
        }
    }

    /// Look up a mode by its wire code.
    pub fn from_code(code: u8) -> Option<PinMode> {
        PinMode::ALL.iter().copied().find(|m| m.code() == code)
    }

    /// Returns `true` for modes whose value is reported by digital messages.
    pub fn is_digital_input(self) -> bool {
        matches!(self, PinMode::Input | PinMode::Pullup)
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::Analog => "ANALOG",
            PinMode::Pwm => "PWM",
            PinMode::Servo => "SERVO",
            PinMode::Shift => "SHIFT",
            PinMode::I2c => "I2C",
            PinMode::OneWire => "ONEWIRE",
            PinMode::Stepper => "STEPPER",
            PinMode::Encoder => "ENCODER",
            PinMode::Serial => "SERIAL",
            PinMode::Pullup => "PULLUP",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`PinMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePinModeError(String);

impl fmt::Display for ParsePinModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pin mode: {}", self.0)
    }
}

impl std::error::Error for ParsePinModeError {}

impl FromStr for PinMode {
    type Err = ParsePinModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PinMode::ALL
            .iter()
            .copied()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePinModeError(s.to_string()))
    }
}

/// Digital level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    /// Numeric value stored in the pin registry (0 or 1).
    pub fn value(self) -> u32 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl From<bool> for PinLevel {
    fn from(on: bool) -> Self {
        if on { PinLevel::High } else { PinLevel::Low }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => write!(f, "LOW"),
            PinLevel::High => write!(f, "HIGH"),
        }
    }
}

/// One pin of the board, as discovered by a capability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Position of the pin in the capability response (0-based).
    pub index: usize,
    /// Modes the firmware reports for this pin, in [`PinMode::ALL`] order.
    pub supported_modes: Vec<PinMode>,
    /// Last mode written by the host or reported by the board.
    pub mode: PinMode,
    /// Last value written by the host or reported by the board.
    pub value: u32,
    /// Analog channel number, if the pin has one.
    pub analog_channel: Option<u8>,
}

impl Pin {
    /// Create a freshly discovered pin: mode `OUTPUT`, value 0, no channel.
    pub fn new(index: usize, supported_modes: Vec<PinMode>) -> Self {
        Pin {
            index,
            supported_modes,
            mode: PinMode::Output,
            value: 0,
            analog_channel: None,
        }
    }

    /// Returns `true` if the firmware reported support for `mode`.
    pub fn supports(&self, mode: PinMode) -> bool {
        self.supported_modes.contains(&mode)
    }
}

/// Firmata protocol version reported by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Which periodic report a `REPORT_*` command toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportKind {
    /// `REPORT_DIGITAL`, addressed by port.
    #[default]
    Digital,
    /// `REPORT_ANALOG`, addressed by analog channel.
    Analog,
}

/// Where the connection handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    AwaitingVersion,
    AwaitingFirmware,
    AwaitingCapabilities,
    AwaitingAnalogMapping,
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::AwaitingVersion => "awaiting-version",
            ConnectionState::AwaitingFirmware => "awaiting-firmware",
            ConnectionState::AwaitingCapabilities => "awaiting-capabilities",
            ConnectionState::AwaitingAnalogMapping => "awaiting-analog-mapping",
            ConnectionState::Ready => "ready",
        };
        write!(f, "{s}")
    }
}
