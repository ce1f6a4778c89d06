//! firmata-core: Core types, events, and error definitions for the Firmata
//! host client.
//!
//! This crate holds the pieces every other crate in the workspace shares:
//! the error taxonomy, the byte-level [`Transport`] trait, the [`Event`]
//! enum with its synchronous [`EventBus`], and the pin/mode types that make
//! up the board model.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Event`] / [`EventBus`] -- board notifications and their dispatch
//! - [`Pin`] / [`PinMode`] -- the discovered pin model
//! - [`Error`] / [`Result`] -- error handling

pub mod bus;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use firmata_core::*`.
pub use bus::{EventBus, Listener, ListenerFailure, SubscriptionId};
pub use error::{Error, Result};
pub use events::{Event, EventKind, Topic};
pub use transport::Transport;
pub use types::*;
