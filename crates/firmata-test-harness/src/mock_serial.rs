//! Scripted transport for deterministic testing of the protocol engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait without hardware.
//! Firmata writes are fire-and-forget, so the mock does not insist that
//! every `send()` matches something: each write is recorded, and when a
//! write equals the next pre-loaded request the paired board response is
//! queued for `receive()`. Unsolicited traffic (port reports, analog
//! samples) is injected with [`feed`](MockTransport::feed).
//!
//! The mock is a cheap handle around shared state: clone it before moving
//! it into a `Board`, and keep the clone to inspect writes or inject bytes.
//!
//! # Example
//!
//! ```
//! use firmata_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends REPORT_VERSION, the board answers 2.5.
//! mock.expect(&[0xF9], &[0xF9, 0x02, 0x05]);
//! // An unsolicited digital port report.
//! mock.feed(&[0x90, 0x04, 0x00]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use firmata_core::error::{Error, Result};
use firmata_core::transport::Transport;

/// A pre-loaded request/response pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes the engine is expected to send.
    request: Vec<u8>,
    /// The bytes the board answers with.
    response: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Chunks waiting to be handed out by `receive()`.
    inbound: VecDeque<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
}

/// A mock [`Transport`] for testing without a board attached.
///
/// Expectations are matched in order against outgoing writes. A write that
/// does not equal the front expectation is still recorded but produces no
/// response. `receive()` hands out queued chunks one at a time (split if
/// the caller's buffer is smaller). When nothing is queued it sleeps for
/// the requested timeout on the tokio clock and returns [`Error::Timeout`],
/// so tests running with a paused clock see timeouts expire instantly.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                inbound: VecDeque::new(),
                connected: true,
                sent_log: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the mock from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data equal to `request` while this is
    /// the front expectation, `response` is queued for `receive()`. An empty
    /// `response` just consumes the expectation.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes the board sends without being asked.
    pub fn feed(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.lock().inbound.push_back(data.to_vec());
        }
    }

    /// All data sent through this transport, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent_log.clone()
    }

    /// Every sent byte, concatenated in order.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.lock().sent_log.concat()
    }

    /// Forget everything sent so far.
    pub fn clear_sent(&mut self) {
        self.lock().sent_log.clear();
    }

    /// Number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Number of inbound chunks not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.lock().connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let matched = state
            .expectations
            .front()
            .is_some_and(|e| e.request.as_slice() == data);
        if matched {
            if let Some(expectation) = state.expectations.pop_front() {
                if !expectation.response.is_empty() {
                    state.inbound.push_back(expectation.response);
                }
            }
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        {
            let mut state = self.lock();
            if !state.connected {
                return Err(Error::NotConnected);
            }

            if let Some(chunk) = state.inbound.front_mut() {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n == chunk.len() {
                    state.inbound.pop_front();
                } else {
                    chunk.drain(..n);
                }
                return Ok(n);
            }
        }

        // Nothing queued: behave like a quiet line and wait out the timeout.
        tokio::time::sleep(timeout).await;
        Err(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.connected = false;
        state.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
