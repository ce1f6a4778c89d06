//! firmata-protocol: the Firmata protocol engine.
//!
//! Bytes from a [`Transport`](firmata_core::Transport) flow through the
//! [`FrameDecoder`] into [`BoardState`], which keeps the [`PinRegistry`]
//! current and produces [`Event`](firmata_core::Event)s. The [`Board`]
//! drives that loop asynchronously, dispatches events, runs the
//! [`Handshake`], and sends frames built by [`commands`].
//!
//! # Modules
//!
//! - [`constants`] -- the wire opcode table
//! - [`commands`] -- pure frame builders
//! - [`decoder`] -- resumable frame decoder
//! - [`responses`] -- sysex response parsers
//! - [`registry`] -- pins, channel map, generation-checked handles
//! - [`state`] -- decoder plus board model, no I/O
//! - [`handshake`] -- connection state machine
//! - [`board`] / [`builder`] -- async front end and its configuration

pub mod board;
pub mod builder;
pub mod commands;
pub mod constants;
pub mod decoder;
pub mod handshake;
pub mod registry;
pub mod responses;
pub mod state;

pub use board::Board;
pub use builder::BoardBuilder;
pub use decoder::{FrameDecoder, Message};
pub use handshake::Handshake;
pub use registry::{PinHandle, PinRegistry};
pub use state::{BoardState, FeedResult};
