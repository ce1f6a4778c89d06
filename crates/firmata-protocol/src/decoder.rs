//! Incremental Firmata frame decoder.
//!
//! Bytes arrive from the transport in arbitrary chunks. [`FrameDecoder`]
//! carries partial frames across [`push`](FrameDecoder::push) calls and
//! turns complete ones into [`Message`]s. It never interprets a message;
//! that is [`BoardState`](crate::state::BoardState)'s job.
//!
//! # States
//!
//! - `Idle`: waiting for a leading (status) byte
//! - `FixedPayload`: version/analog/digital message, two data bytes to go
//! - `Sysex`: accumulating until `END_SYSEX`
//! - `Overflow`: discarding an over-long sysex frame until it ends
//!
//! Malformed input is reported inline as an `Err` item and decoding
//! continues with the next byte.
//!
//! # Example
//!
//! ```
//! use firmata_protocol::decoder::{FrameDecoder, Message};
//!
//! let mut decoder = FrameDecoder::new();
//! assert!(decoder.push(&[0xF9, 0x02]).is_empty());
//! let out = decoder.push(&[0x05]);
//! assert!(matches!(out[0], Ok(Message::ReportVersion { major: 2, minor: 5 })));
//! ```

use bytes::{Bytes, BytesMut};
use firmata_core::{Error, Result};
use tracing::{trace, warn};

use crate::constants::*;

/// One complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `REPORT_VERSION major minor`.
    ReportVersion { major: u8, minor: u8 },
    /// `ANALOG_MESSAGE` for one channel.
    Analog { channel: u8, value: u16 },
    /// `DIGITAL_MESSAGE` for one 8-pin port.
    Digital { port: u8, value: u16 },
    /// A sysex frame. `payload` excludes `START_SYSEX`, the sub-command and
    /// `END_SYSEX`.
    Sysex { command: u8, payload: Bytes },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    FixedPayload { command: u8, remaining: usize },
    Sysex,
    Overflow,
}

/// Resumable decoder from raw bytes to [`Message`]s.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    /// Data bytes of the frame in progress.
    buffer: BytesMut,
    /// Longest accepted sysex frame, counting `START_SYSEX` and `END_SYSEX`.
    max_sysex_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with the default maximum sysex length.
    pub fn new() -> Self {
        Self::with_max_sysex_len(DEFAULT_MAX_SYSEX_LEN)
    }

    /// Create a decoder that rejects sysex frames longer than `max_len` bytes.
    pub fn with_max_sysex_len(max_len: usize) -> Self {
        Self {
            state: State::Idle,
            buffer: BytesMut::with_capacity(64),
            max_sysex_len: max_len,
        }
    }

    /// Returns `true` if no frame is in progress.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
    }

    /// Feed a chunk of bytes and return every frame it completes, in order.
    ///
    /// Errors (`Protocol`, `UnknownCommand`) appear in the output at the
    /// position they were detected; they never stop decoding.
    pub fn push(&mut self, data: &[u8]) -> Vec<Result<Message>> {
        trace!(bytes = data.len(), data = ?data, "decoder input");
        let mut out = Vec::new();
        for &byte in data {
            self.push_byte(byte, &mut out);
        }
        out
    }

    fn push_byte(&mut self, byte: u8, out: &mut Vec<Result<Message>>) {
        match self.state {
            State::Idle => self.lead(byte, out),

            State::FixedPayload { command, remaining } => {
                if is_status(byte) {
                    out.push(Err(self.interrupted(command, byte)));
                    self.lead(byte, out);
                    return;
                }
                self.buffer.extend_from_slice(&[byte]);
                if remaining > 1 {
                    self.state = State::FixedPayload {
                        command,
                        remaining: remaining - 1,
                    };
                } else {
                    out.push(Ok(self.finish_fixed(command)));
                }
            }

            State::Sysex => {
                if byte == END_SYSEX {
                    out.push(self.finish_sysex());
                } else if is_status(byte) {
                    out.push(Err(self.interrupted(START_SYSEX, byte)));
                    self.lead(byte, out);
                } else if self.buffer.len() + 3 > self.max_sysex_len {
                    warn!(
                        max = self.max_sysex_len,
                        "sysex frame too long, discarding"
                    );
                    out.push(Err(Error::Protocol(format!(
                        "sysex frame exceeds {} bytes",
                        self.max_sysex_len
                    ))));
                    self.buffer.clear();
                    self.state = State::Overflow;
                } else {
                    self.buffer.extend_from_slice(&[byte]);
                }
            }

            State::Overflow => {
                if byte == END_SYSEX {
                    self.state = State::Idle;
                } else if is_status(byte) {
                    self.state = State::Idle;
                    self.lead(byte, out);
                }
            }
        }
    }

    /// Handle a byte seen while idle.
    fn lead(&mut self, byte: u8, out: &mut Vec<Result<Message>>) {
        self.buffer.clear();
        match byte {
            REPORT_VERSION | 0x90..=0x9F | 0xE0..=0xEF => {
                self.state = State::FixedPayload {
                    command: byte,
                    remaining: 2,
                };
            }
            START_SYSEX => self.state = State::Sysex,
            _ => {
                warn!(byte = format_args!("0x{byte:02X}"), "unknown command byte");
                self.state = State::Idle;
                out.push(Err(Error::UnknownCommand(byte)));
            }
        }
    }

    fn interrupted(&mut self, command: u8, byte: u8) -> Error {
        warn!(
            command = format_args!("0x{command:02X}"),
            byte = format_args!("0x{byte:02X}"),
            "frame interrupted by status byte"
        );
        self.buffer.clear();
        self.state = State::Idle;
        Error::Protocol(format!(
            "frame 0x{command:02X} interrupted by status byte 0x{byte:02X}"
        ))
    }

    fn finish_fixed(&mut self, command: u8) -> Message {
        let first = self.buffer[0];
        let second = self.buffer[1];
        self.buffer.clear();
        self.state = State::Idle;

        match command {
            REPORT_VERSION => Message::ReportVersion {
                major: first,
                minor: second,
            },
            0xE0..=0xEF => Message::Analog {
                channel: command & 0x0F,
                value: join_7bit(first, second),
            },
            _ => Message::Digital {
                port: command & 0x0F,
                value: join_7bit(first, second),
            },
        }
    }

    fn finish_sysex(&mut self) -> Result<Message> {
        self.state = State::Idle;
        let mut frame = self.buffer.split();
        if frame.is_empty() {
            return Err(Error::Protocol("empty sysex frame".into()));
        }
        let payload = frame.split_off(1).freeze();
        let command = frame[0];
        trace!(
            command = format_args!("0x{command:02X}"),
            len = payload.len(),
            "sysex frame"
        );
        Ok(Message::Sysex { command, payload })
    }
}
