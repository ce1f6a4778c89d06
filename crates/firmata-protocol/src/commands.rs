//! Firmata command builders.
//!
//! Every function here is pure: it produces the bytes of one frame and
//! performs no I/O. [`Board`](crate::board::Board) sends them and keeps the
//! pin registry in step; tests and tools can use them directly.
//!
//! Arguments that cannot be expressed on the wire (a pin above 127, a value
//! wider than the frame allows) are rejected with
//! [`Error::InvalidParameter`] instead of being silently truncated.

use bytes::{BufMut, BytesMut};
use firmata_core::{Error, PinMode, Result};

use crate::constants::*;

/// Highest value a 7-bit data byte can hold.
const MAX_DATA_BYTE: usize = 0x7F;

/// Highest value a 7-bit `(lsb, msb)` pair can hold.
const MAX_14BIT: u32 = 0x3FFF;

/// Highest 10-bit I2C address.
const MAX_I2C_ADDRESS: u16 = 0x3FF;

/// Build a sysex frame around `payload`.
fn sysex(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(payload.len() + 3);
    buf.put_u8(START_SYSEX);
    buf.put_u8(command);
    buf.put_slice(payload);
    buf.put_u8(END_SYSEX);
    buf.to_vec()
}

fn data_byte(name: &str, value: usize) -> Result<u8> {
    if value > MAX_DATA_BYTE {
        return Err(Error::InvalidParameter(format!(
            "{name} {value} does not fit in a 7-bit data byte"
        )));
    }
    Ok(value as u8)
}

fn nibble(name: &str, value: u8) -> Result<u8> {
    if value >= MAX_PORTS {
        return Err(Error::InvalidParameter(format!(
            "{name} {value} out of range (0-{})",
            MAX_PORTS - 1
        )));
    }
    Ok(value)
}

fn fourteen_bit(name: &str, value: u32) -> Result<(u8, u8)> {
    if value > MAX_14BIT {
        return Err(Error::InvalidParameter(format!(
            "{name} {value} exceeds 14 bits"
        )));
    }
    Ok(split_7bit(value as u16))
}

// ---------------------------------------------------------------
// Queries
// ---------------------------------------------------------------

/// Ask the board for its protocol version.
pub fn cmd_report_version() -> Vec<u8> {
    vec![REPORT_VERSION]
}

/// Ask the board for its firmware name and version.
pub fn cmd_query_firmware() -> Vec<u8> {
    sysex(REPORT_FIRMWARE, &[])
}

/// Ask the board which modes each pin supports.
pub fn cmd_query_capabilities() -> Vec<u8> {
    sysex(CAPABILITY_QUERY, &[])
}

/// Ask the board which pins carry analog channels.
pub fn cmd_query_analog_mapping() -> Vec<u8> {
    sysex(ANALOG_MAPPING_QUERY, &[])
}

/// Ask the board for the mode and value of one pin.
pub fn cmd_query_pin_state(pin: usize) -> Result<Vec<u8>> {
    Ok(sysex(PIN_STATE_QUERY, &[data_byte("pin", pin)?]))
}

/// Reset the board.
pub fn cmd_reset() -> Vec<u8> {
    vec![SYSTEM_RESET]
}

// ---------------------------------------------------------------
// Pin control
// ---------------------------------------------------------------

/// Set a pin's mode.
pub fn cmd_set_pin_mode(pin: usize, mode: PinMode) -> Result<Vec<u8>> {
    Ok(vec![PIN_MODE, data_byte("pin", pin)?, mode.code()])
}

/// Write all eight pins of a digital port. Bit `i` of `mask` is pin
/// `port * 8 + i`.
pub fn cmd_digital_port(port: u8, mask: u8) -> Result<Vec<u8>> {
    let port = nibble("port", port)?;
    let (lsb, msb) = split_7bit(u16::from(mask));
    Ok(vec![DIGITAL_MESSAGE | port, lsb, msb])
}

/// Analog (PWM/servo) write for pins 0-15 with a 14-bit value.
pub fn cmd_analog_write(pin: usize, value: u32) -> Result<Vec<u8>> {
    if pin > MAX_ANALOG_MESSAGE_PIN {
        return Err(Error::InvalidParameter(format!(
            "pin {pin} needs an extended analog write"
        )));
    }
    let (lsb, msb) = fourteen_bit("analog value", value)?;
    Ok(vec![ANALOG_MESSAGE | pin as u8, lsb, msb])
}

/// Analog write for any pin, with as many 7-bit groups as `value` needs.
pub fn cmd_extended_analog(pin: usize, value: u32) -> Result<Vec<u8>> {
    let mut payload = vec![data_byte("pin", pin)?];
    let mut rest = value;
    loop {
        payload.push((rest & 0x7F) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    Ok(sysex(EXTENDED_ANALOG, &payload))
}

/// Enable or disable reporting of a digital port.
pub fn cmd_report_digital(port: u8, enabled: bool) -> Result<Vec<u8>> {
    Ok(vec![REPORT_DIGITAL | nibble("port", port)?, u8::from(enabled)])
}

/// Enable or disable reporting of an analog channel.
pub fn cmd_report_analog(channel: u8, enabled: bool) -> Result<Vec<u8>> {
    Ok(vec![
        REPORT_ANALOG | nibble("analog channel", channel)?,
        u8::from(enabled),
    ])
}

/// Set how often the board samples analog inputs, in milliseconds.
pub fn cmd_sampling_interval(interval_ms: u32) -> Result<Vec<u8>> {
    let (lsb, msb) = fourteen_bit("sampling interval", interval_ms)?;
    Ok(sysex(SAMPLING_INTERVAL, &[lsb, msb]))
}

// ---------------------------------------------------------------
// I2C
// ---------------------------------------------------------------

/// Configure the I2C bus with a read delay in microseconds.
pub fn cmd_i2c_config(delay_us: u32) -> Result<Vec<u8>> {
    let (lsb, msb) = fourteen_bit("I2C delay", delay_us)?;
    Ok(sysex(I2C_CONFIG, &[lsb, msb]))
}

/// The two address bytes of an I2C request: low seven address bits, then
/// the upper address bits with the read/write mode above them. Addresses
/// past 7 bits also carry the 10-bit address flag.
fn i2c_address(address: u16, mode: u8) -> Result<[u8; 2]> {
    if address > MAX_I2C_ADDRESS {
        return Err(Error::InvalidParameter(format!(
            "I2C address 0x{address:X} exceeds 10 bits"
        )));
    }
    let low = (address & 0x7F) as u8;
    let mut high = ((address >> 7) & 0x07) as u8 | (mode << I2C_MODE_SHIFT);
    if address > MAX_I2C_7BIT_ADDRESS {
        high |= I2C_10BIT_ADDRESS_MODE;
    }
    Ok([low, high])
}

/// Write `data` to the I2C device at `address`.
pub fn cmd_i2c_write_request(address: u16, data: &[u8]) -> Result<Vec<u8>> {
    let mut payload = BytesMut::with_capacity(2 + data.len() * 2);
    payload.put_slice(&i2c_address(address, I2C_MODE_WRITE)?);
    for &byte in data {
        let (lsb, msb) = split_7bit(u16::from(byte));
        payload.put_u8(lsb);
        payload.put_u8(msb);
    }
    Ok(sysex(I2C_REQUEST, &payload))
}

/// Read `count` bytes once from the I2C device at `address`.
pub fn cmd_i2c_read_request(address: u16, count: u32) -> Result<Vec<u8>> {
    let [low, high] = i2c_address(address, I2C_MODE_READ)?;
    let (lsb, msb) = fourteen_bit("I2C read length", count)?;
    Ok(sysex(I2C_REQUEST, &[low, high, lsb, msb]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_frames() {
        assert_eq!(cmd_report_version(), vec![0xF9]);
        assert_eq!(cmd_query_firmware(), vec![0xF0, 0x79, 0xF7]);
        assert_eq!(cmd_query_capabilities(), vec![0xF0, 0x6B, 0xF7]);
        assert_eq!(cmd_query_analog_mapping(), vec![0xF0, 0x69, 0xF7]);
        assert_eq!(cmd_query_pin_state(13).unwrap(), vec![0xF0, 0x6D, 0x0D, 0xF7]);
        assert_eq!(cmd_reset(), vec![0xFF]);
    }

    #[test]
    fn pin_mode_frame() {
        assert_eq!(
            cmd_set_pin_mode(13, PinMode::Output).unwrap(),
            vec![0xF4, 0x0D, 0x01]
        );
        assert_eq!(
            cmd_set_pin_mode(2, PinMode::Pullup).unwrap(),
            vec![0xF4, 0x02, 0x0B]
        );
    }

    #[test]
    fn pin_above_127_is_rejected() {
        assert!(matches!(
            cmd_set_pin_mode(128, PinMode::Input),
            Err(Error::InvalidParameter(_))
        ));
        assert!(cmd_query_pin_state(200).is_err());
    }

    #[test]
    fn digital_port_splits_bit_seven_into_msb() {
        // Pin 13 high on port 1 is bit 5.
        assert_eq!(cmd_digital_port(1, 0x20).unwrap(), vec![0x91, 0x20, 0x00]);
        // Bit 7 travels in the second data byte.
        assert_eq!(cmd_digital_port(0, 0x81).unwrap(), vec![0x90, 0x01, 0x01]);
        assert!(cmd_digital_port(16, 0).is_err());
    }

    #[test]
    fn analog_write_frame() {
        assert_eq!(cmd_analog_write(9, 255).unwrap(), vec![0xE9, 0x7F, 0x01]);
        assert!(cmd_analog_write(16, 1).is_err());
        assert!(cmd_analog_write(3, 0x4000).is_err());
    }

    #[test]
    fn extended_analog_uses_as_many_groups_as_needed() {
        assert_eq!(
            cmd_extended_analog(20, 0).unwrap(),
            vec![0xF0, 0x6F, 20, 0x00, 0xF7]
        );
        assert_eq!(
            cmd_extended_analog(20, 0x4000).unwrap(),
            vec![0xF0, 0x6F, 20, 0x00, 0x00, 0x01, 0xF7]
        );
    }

    #[test]
    fn reporting_frames() {
        assert_eq!(cmd_report_digital(0, true).unwrap(), vec![0xD0, 0x01]);
        assert_eq!(cmd_report_digital(15, false).unwrap(), vec![0xDF, 0x00]);
        assert_eq!(cmd_report_analog(3, true).unwrap(), vec![0xC3, 0x01]);
        assert!(cmd_report_analog(16, true).is_err());
    }

    #[test]
    fn sampling_interval_frame() {
        assert_eq!(
            cmd_sampling_interval(200).unwrap(),
            vec![0xF0, 0x7A, 0x48, 0x01, 0xF7]
        );
    }

    #[test]
    fn i2c_config_frame() {
        assert_eq!(cmd_i2c_config(0).unwrap(), vec![0xF0, 0x78, 0x00, 0x00, 0xF7]);
    }

    #[test]
    fn i2c_write_request_frame() {
        // Nunchuck init: write 0x40 0x00 to 0x52.
        assert_eq!(
            cmd_i2c_write_request(0x52, &[0x40, 0x00]).unwrap(),
            vec![0xF0, 0x76, 0x52, 0x00, 0x40, 0x00, 0x00, 0x00, 0xF7]
        );
        // Data bytes above 0x7F spill into the second byte.
        assert_eq!(
            cmd_i2c_write_request(0x52, &[0xFF]).unwrap(),
            vec![0xF0, 0x76, 0x52, 0x00, 0x7F, 0x01, 0xF7]
        );
    }

    #[test]
    fn i2c_read_request_sets_mode_bits() {
        assert_eq!(
            cmd_i2c_read_request(0x52, 6).unwrap(),
            vec![0xF0, 0x76, 0x52, 0x08, 0x06, 0x00, 0xF7]
        );
        // 10-bit address: upper bits below the mode bits, flag above them.
        assert_eq!(
            cmd_i2c_read_request(0x2A5, 1).unwrap(),
            vec![0xF0, 0x76, 0x25, 0x2D, 0x01, 0x00, 0xF7]
        );
        assert!(cmd_i2c_read_request(0x400, 1).is_err());
    }

    #[test]
    fn i2c_ten_bit_flag_only_past_seven_bits() {
        assert_eq!(
            cmd_i2c_write_request(0x7F, &[]).unwrap(),
            vec![0xF0, 0x76, 0x7F, 0x00, 0xF7]
        );
        assert_eq!(
            cmd_i2c_write_request(0x80, &[]).unwrap(),
            vec![0xF0, 0x76, 0x00, 0x21, 0xF7]
        );
    }
}
