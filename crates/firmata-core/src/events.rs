//! Board event types.
//!
//! Every notification the protocol engine produces is an [`Event`]. Events
//! are dispatched synchronously through the [`EventBus`](crate::bus::EventBus)
//! and republished on a `tokio::sync::broadcast` channel by the board.
//!
//! Subscriptions are keyed by [`Topic`]: either an [`EventKind`] (all events
//! of one variant) or a narrower per-pin / per-channel topic for reads.

use std::fmt;

use crate::types::{PinMode, ProtocolVersion};

/// An event produced by the protocol engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The board reported its protocol version.
    ReportVersion {
        version: ProtocolVersion,
    },

    /// The board reported its firmware name and version.
    FirmwareName {
        name: String,
        version: ProtocolVersion,
    },

    /// A capability response replaced the pin registry.
    CapabilityQuery {
        /// Number of pins discovered.
        pin_count: usize,
    },

    /// An analog mapping response replaced the channel map.
    AnalogMappingQuery {
        /// Number of analog channels discovered.
        channel_count: usize,
    },

    /// A mapped analog channel reported a new value.
    AnalogRead {
        channel: u8,
        value: u32,
    },

    /// A pin in an input mode changed level in a digital port report.
    DigitalRead {
        pin: usize,
        value: u32,
    },

    /// Response to a pin state query.
    PinState {
        pin: usize,
        mode: PinMode,
        value: u32,
    },

    /// Data returned by an I2C device.
    I2cReply {
        address: u16,
        register: u16,
        data: Vec<u16>,
    },

    /// The connection handshake finished.
    Ready,

    /// A sysex frame with a sub-command the engine does not interpret.
    Unknown {
        command: u8,
        payload: Vec<u8>,
    },
}

/// Discriminant of an [`Event`], used to subscribe to one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReportVersion,
    FirmwareName,
    CapabilityQuery,
    AnalogMappingQuery,
    AnalogRead,
    DigitalRead,
    PinState,
    I2cReply,
    Ready,
    Unknown,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::ReportVersion => "report_version",
            EventKind::FirmwareName => "firmware_name",
            EventKind::CapabilityQuery => "capability_query",
            EventKind::AnalogMappingQuery => "analog_mapping_query",
            EventKind::AnalogRead => "analog_read",
            EventKind::DigitalRead => "digital_read",
            EventKind::PinState => "pin_state",
            EventKind::I2cReply => "i2c_reply",
            EventKind::Ready => "ready",
            EventKind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every event of one variant.
    Kind(EventKind),
    /// `AnalogRead` events for a single channel.
    AnalogChannel(u8),
    /// `DigitalRead` events for a single pin.
    DigitalPin(usize),
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Topic::Kind(kind)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Kind(kind) => write!(f, "{kind}"),
            Topic::AnalogChannel(ch) => write!(f, "analog_read_{ch}"),
            Topic::DigitalPin(pin) => write!(f, "digital_read_{pin}"),
        }
    }
}

impl Event {
    /// The variant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ReportVersion { .. } => EventKind::ReportVersion,
            Event::FirmwareName { .. } => EventKind::FirmwareName,
            Event::CapabilityQuery { .. } => EventKind::CapabilityQuery,
            Event::AnalogMappingQuery { .. } => EventKind::AnalogMappingQuery,
            Event::AnalogRead { .. } => EventKind::AnalogRead,
            Event::DigitalRead { .. } => EventKind::DigitalRead,
            Event::PinState { .. } => EventKind::PinState,
            Event::I2cReply { .. } => EventKind::I2cReply,
            Event::Ready => EventKind::Ready,
            Event::Unknown { .. } => EventKind::Unknown,
        }
    }

    /// The pin- or channel-specific topic of this event, if it has one.
    pub fn specific_topic(&self) -> Option<Topic> {
        match self {
            Event::AnalogRead { channel, .. } => Some(Topic::AnalogChannel(*channel)),
            Event::DigitalRead { pin, .. } => Some(Topic::DigitalPin(*pin)),
            _ => None,
        }
    }

    /// All topics this event is dispatched to, broadest first.
    pub fn topics(&self) -> impl Iterator<Item = Topic> {
        std::iter::once(Topic::Kind(self.kind())).chain(self.specific_topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analog_read_has_channel_topic() {
        let ev = Event::AnalogRead {
            channel: 3,
            value: 512,
        };
        let topics: Vec<Topic> = ev.topics().collect();
        assert_eq!(
            topics,
            vec![Topic::Kind(EventKind::AnalogRead), Topic::AnalogChannel(3)]
        );
    }

    #[test]
    fn digital_read_has_pin_topic() {
        let ev = Event::DigitalRead { pin: 2, value: 1 };
        assert_eq!(ev.specific_topic(), Some(Topic::DigitalPin(2)));
        assert_eq!(Topic::DigitalPin(2).to_string(), "digital_read_2");
    }

    #[test]
    fn ready_has_only_kind_topic() {
        let topics: Vec<Topic> = Event::Ready.topics().collect();
        assert_eq!(topics, vec![Topic::Kind(EventKind::Ready)]);
    }

    #[test]
    fn kind_matches_variant() {
        let ev = Event::I2cReply {
            address: 0x52,
            register: 0,
            data: vec![],
        };
        assert_eq!(ev.kind(), EventKind::I2cReply);
        assert_eq!(ev.kind().to_string(), "i2c_reply");
    }

    #[test]
    fn event_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Event>();
        assert_sync::<Event>();
    }
}
