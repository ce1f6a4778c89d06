//! # firmata -- Host-side Firmata client
//!
//! `firmata` is an asynchronous Rust library for talking to microcontrollers
//! running Firmata firmware (StandardFirmata on an Arduino, the WiFi and
//! Ethernet variants on ESP boards). It discovers the board's pins, keeps a
//! model of their modes and values, and turns the board's reports into
//! typed events.
//!
//! ## Quick Start
//!
//! Blink the on-board LED of an Arduino:
//!
//! ```no_run
//! use std::time::Duration;
//! use firmata::{BoardBuilder, PinLevel, PinMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut board = BoardBuilder::new()
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!     board.connect().await?;
//!
//!     board.set_pin_mode(13, PinMode::Output).await?;
//!     loop {
//!         board.digital_write(13, PinLevel::High).await?;
//!         tokio::time::sleep(Duration::from_millis(500)).await;
//!         board.digital_write(13, PinLevel::Low).await?;
//!         tokio::time::sleep(Duration::from_millis(500)).await;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                             |
//! |------------------------|-----------------------------------------------------|
//! | `firmata-core`         | [`Transport`] trait, [`Event`]s, [`EventBus`], pin types, errors |
//! | `firmata-transport`    | Serial, TCP and wrapped-stream transports           |
//! | `firmata-protocol`     | Decoder, encoder, pin registry, handshake, [`Board`] |
//! | **`firmata`**          | This facade crate -- re-exports everything          |
//!
//! ## Events
//!
//! Board data is only read while the board is driven by
//! [`connect`](Board::connect), [`poll`](Board::poll) or
//! [`poll_for`](Board::poll_for). Every decoded event is delivered two
//! ways:
//!
//! - synchronously to listeners registered with [`Board::on`] /
//!   [`Board::once`], keyed by [`Topic`] (an [`EventKind`], or a single
//!   digital pin / analog channel);
//! - to every [`Board::subscribe`] receiver over a
//!   `tokio::sync::broadcast` channel.
//!
//! ## Transports
//!
//! [`BoardBuilder::build`] opens a serial port. Anything else goes through
//! [`BoardBuilder::build_with_transport`]: a [`TcpTransport`] for network
//! boards, or [`wrap`] around an already-open stream.

pub use firmata_core::*;

pub use firmata_protocol::{
    Board, BoardBuilder, BoardState, FeedResult, FrameDecoder, Handshake, Message, PinHandle,
    PinRegistry,
};

pub use firmata_transport::{
    SerialConfig, SerialTransport, StreamTransport, TcpTransport, open_serial, wrap,
};

/// Protocol engine internals: wire constants, frame builders, parsers.
pub mod protocol {
    pub use firmata_protocol::*;
}

/// Transport implementations.
pub mod transport {
    pub use firmata_transport::*;
}
