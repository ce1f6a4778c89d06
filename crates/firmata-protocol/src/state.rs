//! Board model driven by decoded frames.
//!
//! [`BoardState`] owns the [`FrameDecoder`] and everything the board has
//! told us: protocol version, firmware, and the [`PinRegistry`]. Feeding it
//! raw bytes mutates that model and returns the resulting [`Event`]s along
//! with any decode errors. It performs no I/O, so it can be driven by the
//! async [`Board`](crate::board::Board) or directly from tests.

use firmata_core::{Error, Event, ProtocolVersion, Result};
use tracing::{debug, trace};

use crate::constants::*;
use crate::decoder::{FrameDecoder, Message};
use crate::registry::PinRegistry;
use crate::responses;

/// Outcome of one [`BoardState::feed`] call.
#[derive(Debug, Default)]
pub struct FeedResult {
    /// Events in the order their frames completed.
    pub events: Vec<Event>,
    /// Non-fatal decode errors (`Protocol`, `UnknownCommand`, ...).
    pub errors: Vec<Error>,
}

impl FeedResult {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.errors.is_empty()
    }
}

/// Decoder plus the board model it keeps up to date.
#[derive(Debug, Default)]
pub struct BoardState {
    decoder: FrameDecoder,
    registry: PinRegistry,
    version: ProtocolVersion,
    firmware_name: Option<String>,
    firmware_version: ProtocolVersion,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `max_len` as the sysex frame limit.
    pub fn with_max_sysex_len(max_len: usize) -> Self {
        Self {
            decoder: FrameDecoder::with_max_sysex_len(max_len),
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PinRegistry {
        &mut self.registry
    }

    /// Protocol version from the last `REPORT_VERSION`.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Firmware name, once the board has answered a firmware query.
    pub fn firmware_name(&self) -> Option<&str> {
        self.firmware_name.as_deref()
    }

    /// Firmware version from the firmware reply.
    pub fn firmware_version(&self) -> ProtocolVersion {
        self.firmware_version
    }

    /// Decode `data` and apply every complete frame to the model.
    pub fn feed(&mut self, data: &[u8]) -> FeedResult {
        let mut result = FeedResult::default();
        for item in self.decoder.push(data) {
            match item.and_then(|message| self.apply(message)) {
                Ok(events) => result.events.extend(events),
                Err(e) => result.errors.push(e),
            }
        }
        result
    }

    fn apply(&mut self, message: Message) -> Result<Vec<Event>> {
        match message {
            Message::ReportVersion { major, minor } => {
                self.version = ProtocolVersion { major, minor };
                debug!(version = %self.version, "protocol version");
                Ok(vec![Event::ReportVersion {
                    version: self.version,
                }])
            }

            Message::Analog { channel, value } => {
                let Some(index) = self.registry.analog_pin(channel) else {
                    trace!(channel, "analog report for unmapped channel");
                    return Ok(Vec::new());
                };
                let value = u32::from(value);
                self.registry.get_mut(index)?.value = value;
                Ok(vec![Event::AnalogRead { channel, value }])
            }

            Message::Digital { port, value } => Ok(self.apply_digital(port, value)),

            Message::Sysex { command, payload } => self.apply_sysex(command, &payload),
        }
    }

    /// Update input pins of `port` from a port report; other pins keep
    /// their cached values.
    fn apply_digital(&mut self, port: u8, port_value: u16) -> Vec<Event> {
        let base = usize::from(port) * PINS_PER_PORT;
        let mut events = Vec::new();
        for bit in 0..PINS_PER_PORT {
            let index = base + bit;
            let Ok(pin) = self.registry.get_mut(index) else {
                break;
            };
            if !pin.mode.is_digital_input() {
                continue;
            }
            pin.value = u32::from((port_value >> bit) & 1);
            events.push(Event::DigitalRead {
                pin: index,
                value: pin.value,
            });
        }
        events
    }

    fn apply_sysex(&mut self, command: u8, payload: &[u8]) -> Result<Vec<Event>> {
        let event = match command {
            CAPABILITY_RESPONSE => {
                let pins = responses::parse_capability_response(payload);
                let pin_count = pins.len();
                self.registry.replace_all(pins);
                Event::CapabilityQuery { pin_count }
            }

            ANALOG_MAPPING_RESPONSE => {
                let mapping = responses::parse_analog_mapping_response(payload);
                let channel_count = self.registry.replace_analog_mapping(&mapping);
                Event::AnalogMappingQuery { channel_count }
            }

            PIN_STATE_RESPONSE => {
                let report = responses::parse_pin_state_response(payload)?;
                let pin = self.registry.get_mut(report.pin)?;
                pin.mode = report.mode;
                pin.value = report.value;
                Event::PinState {
                    pin: report.pin,
                    mode: report.mode,
                    value: report.value,
                }
            }

            REPORT_FIRMWARE => {
                let report = responses::parse_firmware_response(payload)?;
                debug!(name = %report.name, version = %report.version, "firmware");
                self.firmware_name = Some(report.name.clone());
                self.firmware_version = report.version;
                Event::FirmwareName {
                    name: report.name,
                    version: report.version,
                }
            }

            I2C_REPLY => {
                let reply = responses::parse_i2c_reply(payload)?;
                Event::I2cReply {
                    address: reply.address,
                    register: reply.register,
                    data: reply.data,
                }
            }

            _ => {
                debug!(
                    command = format_args!("0x{command:02X}"),
                    len = payload.len(),
                    "unhandled sysex"
                );
                Event::Unknown {
                    command,
                    payload: payload.to_vec(),
                }
            }
        };
        Ok(vec![event])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Byte strings captured from a StandardFirmata Arduino Uno plus a
    //! 20-pin capability response.

    /// Capability response with 20 pin groups: 0-1 serial-only, 2-13
    /// digital (3,5,6,9,10,11 also PWM), 14-19 digital + analog.
    pub fn capability_response() -> Vec<u8> {
        let mut bytes = vec![0xF0, 0x6C];
        for pin in 0..20u8 {
            if pin >= 2 {
                bytes.extend([0x00, 0x01, 0x01, 0x01, 0x0B, 0x01]);
            }
            if [3, 5, 6, 9, 10, 11].contains(&pin) {
                bytes.extend([0x03, 0x08]);
            }
            if pin >= 14 {
                bytes.extend([0x02, 0x0A]);
            }
            bytes.push(0x7F);
        }
        bytes.push(0xF7);
        bytes
    }

    /// Analog mapping: pins 0-13 have no channel, 14-19 are A0-A5.
    pub fn analog_mapping_response() -> Vec<u8> {
        let mut bytes = vec![0xF0, 0x6A];
        bytes.extend([0x7F; 14]);
        bytes.extend(0..6u8);
        bytes.push(0xF7);
        bytes
    }

    /// Firmware reply "StandardFirmata" version 2.5.
    pub fn firmware_response() -> Vec<u8> {
        let mut bytes = vec![0xF0, 0x79, 0x02, 0x05];
        for c in "StandardFirmata".bytes() {
            bytes.extend([c & 0x7F, c >> 7]);
        }
        bytes.push(0xF7);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use firmata_core::PinMode;

    fn discovered() -> BoardState {
        let mut state = BoardState::new();
        state.feed(&capability_response());
        state.feed(&analog_mapping_response());
        state
    }

    #[test]
    fn capability_fixture_yields_20_pins() {
        let mut state = BoardState::new();
        let result = state.feed(&capability_response());
        assert!(result.errors.is_empty());
        assert_eq!(result.events, vec![Event::CapabilityQuery { pin_count: 20 }]);
        assert_eq!(state.registry().len(), 20);

        let pins = state.registry().pins();
        assert!(pins[0].supported_modes.is_empty());
        assert_eq!(
            pins[3].supported_modes,
            vec![PinMode::Input, PinMode::Output, PinMode::Pwm, PinMode::Pullup]
        );
        assert!(pins[14].supports(PinMode::Analog));
    }

    #[test]
    fn analog_mapping_fixture_yields_6_channels() {
        let mut state = BoardState::new();
        state.feed(&capability_response());
        let result = state.feed(&analog_mapping_response());
        assert_eq!(
            result.events,
            vec![Event::AnalogMappingQuery { channel_count: 6 }]
        );

        let registry = state.registry();
        assert_eq!(registry.analog_pins().len(), 6);
        for channel in 0..6u8 {
            assert_eq!(registry.analog_pin(channel), Some(14 + usize::from(channel)));
        }
        assert_eq!(registry.get(13).unwrap().analog_channel, None);
        assert_eq!(registry.get(16).unwrap().analog_channel, Some(2));
    }

    #[test]
    fn firmware_fixture() {
        let mut state = BoardState::new();
        let result = state.feed(&firmware_response());
        assert_eq!(state.firmware_name(), Some("StandardFirmata"));
        assert_eq!(
            state.firmware_version(),
            ProtocolVersion { major: 2, minor: 5 }
        );
        assert!(matches!(
            &result.events[0],
            Event::FirmwareName { name, .. } if name == "StandardFirmata"
        ));
    }

    #[test]
    fn report_version_is_stored() {
        let mut state = BoardState::new();
        state.feed(&[0xF9, 0x02, 0x03]);
        assert_eq!(state.version().to_string(), "2.3");
    }

    #[test]
    fn split_sysex_matches_single_feed() {
        let mut stream = capability_response();
        stream.extend(analog_mapping_response());
        stream.extend(firmware_response());

        let mut whole = BoardState::new();
        let expected = whole.feed(&stream).events;

        for split in 0..=stream.len() {
            let mut state = BoardState::new();
            let mut events = state.feed(&stream[..split]).events;
            events.extend(state.feed(&stream[split..]).events);

            assert_eq!(events, expected, "split at {split}");
            assert_eq!(state.registry().pins(), whole.registry().pins());
            assert_eq!(state.registry().analog_pins(), whole.registry().analog_pins());
            assert_eq!(state.firmware_name(), whole.firmware_name());
        }
    }

    #[test]
    fn digital_message_updates_input_pins_only() {
        let mut state = discovered();
        state.registry_mut().get_mut(2).unwrap().mode = PinMode::Input;
        state.registry_mut().get_mut(4).unwrap().mode = PinMode::Pullup;
        // Pin 3 stays OUTPUT with a cached HIGH.
        state.registry_mut().get_mut(3).unwrap().value = 1;

        // Port 0 report: bits 2 and 4 set, bit 3 clear.
        let result = state.feed(&[0x90, 0b0001_0100, 0x00]);
        assert_eq!(
            result.events,
            vec![
                Event::DigitalRead { pin: 2, value: 1 },
                Event::DigitalRead { pin: 4, value: 1 },
            ]
        );
        assert_eq!(state.registry().get(3).unwrap().value, 1);

        state.feed(&[0x90, 0x00, 0x00]);
        assert_eq!(state.registry().get(2).unwrap().value, 0);
        assert_eq!(state.registry().get(3).unwrap().value, 1);
    }

    #[test]
    fn digital_message_for_undiscovered_port_is_ignored() {
        let mut state = discovered();
        let result = state.feed(&[0x9F, 0x7F, 0x01]);
        assert!(result.is_empty());
    }

    #[test]
    fn analog_message_updates_mapped_pin() {
        let mut state = discovered();
        let result = state.feed(&[0xE2, 0x7F, 0x07]);
        assert_eq!(
            result.events,
            vec![Event::AnalogRead {
                channel: 2,
                value: 1023
            }]
        );
        assert_eq!(state.registry().get(16).unwrap().value, 1023);

        // Channel 9 is not mapped.
        assert!(state.feed(&[0xE9, 0x01, 0x00]).is_empty());
    }

    #[test]
    fn pin_state_response_updates_registry() {
        let mut state = discovered();
        let result = state.feed(&[0xF0, 0x6E, 0x0D, 0x01, 0x01, 0xF7]);
        assert_eq!(
            result.events,
            vec![Event::PinState {
                pin: 13,
                mode: PinMode::Output,
                value: 1
            }]
        );
        assert_eq!(state.registry().get(13).unwrap().value, 1);
    }

    #[test]
    fn pin_state_for_unknown_pin_is_an_error() {
        let mut state = BoardState::new();
        let result = state.feed(&[0xF0, 0x6E, 0x0D, 0x01, 0x01, 0xF7]);
        assert!(result.events.is_empty());
        assert!(matches!(
            result.errors[0],
            Error::OutOfRangePin { pin: 13, count: 0 }
        ));
    }

    #[test]
    fn i2c_reply_event() {
        let mut state = BoardState::new();
        let result = state.feed(&[
            0xF0, 0x77, 0x52, 0x00, 0x00, 0x00, 0x7F, 0x01, 0x03, 0x00, 0xF7,
        ]);
        assert_eq!(
            result.events,
            vec![Event::I2cReply {
                address: 0x52,
                register: 0,
                data: vec![255, 3]
            }]
        );
    }

    #[test]
    fn unknown_sysex_emits_unknown_and_stream_continues() {
        let mut state = BoardState::new();
        let result = state.feed(&[0xF0, 0x71, 0x48, 0x00, 0xF7, 0xF9, 0x02, 0x05]);
        assert_eq!(
            result.events,
            vec![
                Event::Unknown {
                    command: 0x71,
                    payload: vec![0x48, 0x00]
                },
                Event::ReportVersion {
                    version: ProtocolVersion { major: 2, minor: 5 }
                },
            ]
        );
    }

    #[test]
    fn errors_are_reported_beside_events() {
        let mut state = BoardState::new();
        let result = state.feed(&[0xA0, 0xF9, 0x02, 0x05, 0xF0, 0x79, 0xF9, 0x02, 0x06]);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(result.errors[0], Error::UnknownCommand(0xA0)));
        assert!(matches!(result.errors[1], Error::Protocol(_)));
        assert_eq!(state.version(), ProtocolVersion { major: 2, minor: 6 });
    }
}
