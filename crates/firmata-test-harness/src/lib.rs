//! firmata-test-harness: Test utilities for the Firmata host client.
//!
//! This crate provides [`MockTransport`], a scripted [`Transport`] for
//! deterministic unit testing of the protocol engine without a board
//! attached.
//!
//! [`Transport`]: firmata_core::Transport

pub mod mock_serial;

pub use mock_serial::MockTransport;
