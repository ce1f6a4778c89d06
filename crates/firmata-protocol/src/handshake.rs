//! Connection handshake state machine.
//!
//! Before a board is usable the host walks it through four queries:
//!
//! ```text
//! Disconnected -> AwaitingVersion -> AwaitingFirmware
//!              -> AwaitingCapabilities -> AwaitingAnalogMapping -> Ready
//! ```
//!
//! Each state owns the query that must be (re)sent while in it, and the
//! event kind that moves it forward. Both live in [`TRANSITIONS`]; the
//! coordinator itself holds no protocol knowledge beyond that table. Time
//! and retries are the driver's concern ([`Board::connect`]).
//!
//! [`Board::connect`]: crate::board::Board::connect

use firmata_core::{ConnectionState, Event, EventKind};
use tracing::debug;

use crate::commands;

/// `(state, awaited event, next state)`.
pub const TRANSITIONS: &[(ConnectionState, EventKind, ConnectionState)] = &[
    (
        ConnectionState::AwaitingVersion,
        EventKind::ReportVersion,
        ConnectionState::AwaitingFirmware,
    ),
    (
        ConnectionState::AwaitingFirmware,
        EventKind::FirmwareName,
        ConnectionState::AwaitingCapabilities,
    ),
    (
        ConnectionState::AwaitingCapabilities,
        EventKind::CapabilityQuery,
        ConnectionState::AwaitingAnalogMapping,
    ),
    (
        ConnectionState::AwaitingAnalogMapping,
        EventKind::AnalogMappingQuery,
        ConnectionState::Ready,
    ),
];

/// The query issued on entering `state`, if any.
pub fn query_for(state: ConnectionState) -> Option<Vec<u8>> {
    match state {
        ConnectionState::AwaitingVersion => Some(commands::cmd_report_version()),
        ConnectionState::AwaitingFirmware => Some(commands::cmd_query_firmware()),
        ConnectionState::AwaitingCapabilities => Some(commands::cmd_query_capabilities()),
        ConnectionState::AwaitingAnalogMapping => Some(commands::cmd_query_analog_mapping()),
        ConnectionState::Disconnected | ConnectionState::Ready => None,
    }
}

/// Tracks where the handshake stands.
#[derive(Debug, Default, Clone)]
pub struct Handshake {
    state: ConnectionState,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Enter `AwaitingVersion` and return the first query to send.
    pub fn start(&mut self) -> Vec<u8> {
        self.state = ConnectionState::AwaitingVersion;
        debug!(state = %self.state, "handshake started");
        commands::cmd_report_version()
    }

    /// Query to (re)send in the current state.
    pub fn current_query(&self) -> Option<Vec<u8>> {
        query_for(self.state)
    }

    /// Feed an event. Returns the new state when the event is the one the
    /// current state was waiting for; other events leave the state alone.
    pub fn advance(&mut self, event: &Event) -> Option<ConnectionState> {
        let kind = event.kind();
        let next = TRANSITIONS
            .iter()
            .find(|(from, on, _)| *from == self.state && *on == kind)
            .map(|&(_, _, to)| to)?;
        debug!(from = %self.state, to = %next, "handshake advanced");
        self.state = next;
        Some(next)
    }

    /// Return to `Disconnected`.
    pub fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
