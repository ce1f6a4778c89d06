//! Parsers for sysex response payloads.
//!
//! Each function takes the payload of a [`Message::Sysex`] (everything
//! between the sub-command and `END_SYSEX`) and returns a typed value.
//! Like the command builders they are pure and perform no I/O.
//!
//! [`Message::Sysex`]: crate::decoder::Message::Sysex

use firmata_core::{Error, Pin, PinMode, ProtocolVersion, Result};

use crate::constants::{CAPABILITY_PIN_END, NO_ANALOG_CHANNEL, join_7bit};

/// Most 7-bit groups folded into a pin state value.
const MAX_PIN_STATE_GROUPS: usize = 4;

/// Decoded `PIN_STATE_RESPONSE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinStateReport {
    pub pin: usize,
    pub mode: PinMode,
    pub value: u32,
}

/// Decoded `REPORT_FIRMWARE` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareReport {
    pub version: ProtocolVersion,
    pub name: String,
}

/// Decoded `I2C_REPLY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I2cReplyReport {
    pub address: u16,
    pub register: u16,
    pub data: Vec<u16>,
}

/// Parse a `CAPABILITY_RESPONSE` into a fresh set of pins.
///
/// Each pin is a run of `(mode, resolution)` pairs closed by `0x7F`. Mode
/// codes this crate does not know are skipped. Bytes after the last `0x7F`
/// do not form a pin and are ignored.
pub fn parse_capability_response(payload: &[u8]) -> Vec<Pin> {
    let mut pins = Vec::new();
    let mut mask: u32 = 0;
    let mut is_mode_byte = true;

    for &byte in payload {
        if byte == CAPABILITY_PIN_END {
            let modes = PinMode::ALL
                .iter()
                .copied()
                .filter(|m| mask & (1 << m.code()) != 0)
                .collect();
            pins.push(Pin::new(pins.len(), modes));
            mask = 0;
            is_mode_byte = true;
            continue;
        }
        if is_mode_byte && u32::from(byte) < u32::BITS {
            mask |= 1 << byte;
        }
        is_mode_byte = !is_mode_byte;
    }

    pins
}

/// Parse an `ANALOG_MAPPING_RESPONSE`: one entry per pin, `None` for pins
/// without an analog channel.
pub fn parse_analog_mapping_response(payload: &[u8]) -> Vec<Option<u8>> {
    payload
        .iter()
        .map(|&b| (b != NO_ANALOG_CHANNEL).then_some(b))
        .collect()
}

/// Parse a `PIN_STATE_RESPONSE`: pin, mode, then the value in 7-bit groups.
pub fn parse_pin_state_response(payload: &[u8]) -> Result<PinStateReport> {
    let [pin, mode, value_bytes @ ..] = payload else {
        return Err(Error::Protocol(format!(
            "pin state response too short ({} bytes)",
            payload.len()
        )));
    };
    let mode = PinMode::from_code(*mode).ok_or_else(|| {
        Error::Protocol(format!("pin state response with unknown mode {mode}"))
    })?;
    let value = value_bytes
        .iter()
        .take(MAX_PIN_STATE_GROUPS)
        .enumerate()
        .fold(0u32, |acc, (i, &b)| acc | (u32::from(b & 0x7F) << (7 * i)));

    Ok(PinStateReport {
        pin: usize::from(*pin),
        mode,
        value,
    })
}

/// Parse a `REPORT_FIRMWARE` reply: major, minor, then the name as 7-bit
/// `(lsb, msb)` character pairs. NUL characters are dropped.
pub fn parse_firmware_response(payload: &[u8]) -> Result<FirmwareReport> {
    let [major, minor, name_bytes @ ..] = payload else {
        return Err(Error::Protocol("firmware response too short".into()));
    };

    let name = name_bytes
        .chunks(2)
        .map(|pair| join_7bit(pair[0], pair.get(1).copied().unwrap_or(0)))
        .filter(|&code| code != 0)
        .filter_map(|code| char::from_u32(u32::from(code)))
        .collect();

    Ok(FirmwareReport {
        version: ProtocolVersion {
            major: *major,
            minor: *minor,
        },
        name,
    })
}

/// Parse an `I2C_REPLY`: address, register, then data words, each a 7-bit
/// `(lsb, msb)` pair.
pub fn parse_i2c_reply(payload: &[u8]) -> Result<I2cReplyReport> {
    let [addr_lsb, addr_msb, reg_lsb, reg_msb, words @ ..] = payload else {
        return Err(Error::Protocol(format!(
            "I2C reply too short ({} bytes)",
            payload.len()
        )));
    };
    if words.len() % 2 != 0 {
        return Err(Error::Protocol("I2C reply has a dangling data byte".into()));
    }

    Ok(I2cReplyReport {
        address: join_7bit(*addr_lsb, *addr_msb),
        register: join_7bit(*reg_lsb, *reg_msb),
        data: words
            .chunks_exact(2)
            .map(|w| join_7bit(w[0], w[1]))
            .collect(),
    })
}
