//! Firmata wire constants.
//!
//! Every opcode, sysex sub-command and sentinel the engine uses lives here,
//! so the encoder and decoder agree on one table.
//!
//! Status bytes have the high bit set (`0x80..=0xFF`); every data byte on
//! the wire is 7-bit. Multi-byte values travel as little-endian groups of
//! seven bits.

// ---------------------------------------------------------------
// Status bytes
// ---------------------------------------------------------------

/// Digital port message, low nibble = port (`0x90..=0x9F`).
pub const DIGITAL_MESSAGE: u8 = 0x90;

/// Analog channel message, low nibble = channel (`0xE0..=0xEF`).
pub const ANALOG_MESSAGE: u8 = 0xE0;

/// Enable/disable analog reporting, low nibble = channel.
pub const REPORT_ANALOG: u8 = 0xC0;

/// Enable/disable digital reporting, low nibble = port.
pub const REPORT_DIGITAL: u8 = 0xD0;

/// Set a pin's mode: `PIN_MODE pin mode`.
pub const PIN_MODE: u8 = 0xF4;

/// Protocol version request/report: `REPORT_VERSION major minor`.
pub const REPORT_VERSION: u8 = 0xF9;

/// Reset the board to its power-on state.
pub const SYSTEM_RESET: u8 = 0xFF;

/// Start of a sysex frame.
pub const START_SYSEX: u8 = 0xF0;

/// End of a sysex frame.
pub const END_SYSEX: u8 = 0xF7;

// ---------------------------------------------------------------
// Sysex sub-commands
// ---------------------------------------------------------------

pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
pub const CAPABILITY_QUERY: u8 = 0x6B;
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
pub const PIN_STATE_QUERY: u8 = 0x6D;
pub const PIN_STATE_RESPONSE: u8 = 0x6E;

/// Analog/PWM write for pins beyond the 16 reachable by `ANALOG_MESSAGE`.
pub const EXTENDED_ANALOG: u8 = 0x6F;

pub const I2C_REQUEST: u8 = 0x76;
pub const I2C_REPLY: u8 = 0x77;
pub const I2C_CONFIG: u8 = 0x78;

/// Firmware name and version, used for both the query and the reply.
pub const REPORT_FIRMWARE: u8 = 0x79;

/// Set the analog sampling interval in milliseconds.
pub const SAMPLING_INTERVAL: u8 = 0x7A;

// ---------------------------------------------------------------
// I2C request modes (bits 3-4 of the second address byte)
// ---------------------------------------------------------------

pub const I2C_MODE_WRITE: u8 = 0x00;
pub const I2C_MODE_READ: u8 = 0x01;

/// Shift of the read/write mode within the second address byte.
pub const I2C_MODE_SHIFT: u8 = 3;

/// Second-address-byte flag marking a 10-bit address.
pub const I2C_10BIT_ADDRESS_MODE: u8 = 0x20;

/// Highest 7-bit I2C address.
pub const MAX_I2C_7BIT_ADDRESS: u16 = 0x7F;

// ---------------------------------------------------------------
// Sentinels and limits
// ---------------------------------------------------------------

/// Separates pins in a capability response.
pub const CAPABILITY_PIN_END: u8 = 0x7F;

/// Analog mapping entry for a pin with no analog channel.
pub const NO_ANALOG_CHANNEL: u8 = 0x7F;

/// Pins per digital port.
pub const PINS_PER_PORT: usize = 8;

/// Ports/channels addressable by the nibble-encoded status bytes.
pub const MAX_PORTS: u8 = 16;

/// Highest pin `ANALOG_MESSAGE` can address; beyond this use `EXTENDED_ANALOG`.
pub const MAX_ANALOG_MESSAGE_PIN: usize = 15;

/// Default upper bound on a buffered sysex frame.
pub const DEFAULT_MAX_SYSEX_LEN: usize = 4096;

/// Mask for a 7-bit data byte.
pub const DATA_MASK: u8 = 0x7F;

/// `true` for status bytes (high bit set).
pub fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// Combine a 7-bit `(lsb, msb)` pair.
pub fn join_7bit(lsb: u8, msb: u8) -> u16 {
    u16::from(lsb & DATA_MASK) | (u16::from(msb & DATA_MASK) << 7)
}

/// Split a 14-bit value into a 7-bit `(lsb, msb)` pair.
pub fn split_7bit(value: u16) -> (u8, u8) {
    ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
}
