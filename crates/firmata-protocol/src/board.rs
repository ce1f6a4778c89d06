//! Board -- the async front end of the protocol engine.
//!
//! [`Board`] ties a [`Transport`] to a [`BoardState`], an [`EventBus`] and
//! the [`Handshake`] coordinator. It is single-owner: every operation takes
//! `&mut self`, and the only suspension points are transport reads and
//! writes. Wrap it in a `tokio::sync::Mutex` to share it between tasks.
//!
//! Incoming data is only read when the caller drives the board, through
//! [`connect`](Board::connect), [`poll`](Board::poll) or
//! [`poll_for`](Board::poll_for). Each decoded event goes to the bus
//! listeners first, then to the broadcast channel returned by
//! [`subscribe`](Board::subscribe).
//!
//! # Example
//!
//! ```no_run
//! use firmata_core::PinLevel;
//! use firmata_protocol::BoardBuilder;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! let mut board = BoardBuilder::new().serial_port("/dev/ttyACM0").build().await?;
//! board.connect().await?;
//! board.digital_write(13, PinLevel::High).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use firmata_core::{
    ConnectionState, Error, Event, EventBus, ListenerFailure, Pin, PinLevel, PinMode,
    ProtocolVersion, ReportKind, Result, SubscriptionId, Topic, Transport,
};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::commands;
use crate::constants::{MAX_ANALOG_MESSAGE_PIN, MAX_PORTS, PINS_PER_PORT};
use crate::handshake::{self, Handshake};
use crate::registry::{PinHandle, PinRegistry};
use crate::state::BoardState;

/// Size of the buffer handed to each transport read.
const READ_BUF_SIZE: usize = 1024;

/// Largest value an `ANALOG_MESSAGE` can carry.
const MAX_ANALOG_MESSAGE_VALUE: u32 = 0x3FFF;

/// Tunables fixed at build time.
#[derive(Debug, Clone)]
pub(crate) struct BoardConfig {
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
    pub max_retries: u32,
    pub report_ports: u8,
}

/// A Firmata board reached over a [`Transport`].
///
/// Constructed via [`BoardBuilder`](crate::builder::BoardBuilder).
pub struct Board {
    transport: Box<dyn Transport>,
    state: BoardState,
    bus: EventBus,
    event_tx: broadcast::Sender<Event>,
    handshake: Handshake,
    config: BoardConfig,
    read_buf: Vec<u8>,
    listener_failures: Vec<ListenerFailure>,
}

impl Board {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        state: BoardState,
        event_tx: broadcast::Sender<Event>,
        config: BoardConfig,
    ) -> Self {
        Board {
            transport,
            state,
            bus: EventBus::new(),
            event_tx,
            handshake: Handshake::new(),
            config,
            read_buf: vec![0u8; READ_BUF_SIZE],
            listener_failures: Vec::new(),
        }
    }

    // ---------------------------------------------------------------
    // Handshake and event loop
    // ---------------------------------------------------------------

    /// Run the connection handshake until the board is ready.
    ///
    /// Sends `REPORT_VERSION`, then queries firmware, capabilities and the
    /// analog mapping, each after the previous answer arrives. A step that
    /// sees no answer within the handshake timeout has its query resent, up
    /// to `max_retries` times; after that [`Error::HandshakeTimeout`] is
    /// returned with the state the handshake was stuck in.
    ///
    /// Once ready, digital reporting is enabled for the configured number of
    /// ports and [`Event::Ready`] is emitted.
    pub async fn connect(&mut self) -> Result<()> {
        info!("starting board handshake");
        let query = self.handshake.start();
        self.send(&query).await?;

        let mut step = self.handshake.state();
        let mut retries = 0;
        let mut deadline = Instant::now() + self.config.handshake_timeout;

        while !self.handshake.is_ready() {
            self.poll().await?;

            let state = self.handshake.state();
            if state != step {
                step = state;
                retries = 0;
                deadline = Instant::now() + self.config.handshake_timeout;
                continue;
            }

            if Instant::now() >= deadline {
                if retries >= self.config.max_retries {
                    warn!(state = %state, retries, "handshake timed out");
                    return Err(Error::HandshakeTimeout { state });
                }
                retries += 1;
                debug!(state = %state, attempt = retries, "resending handshake query");
                if let Some(query) = self.handshake.current_query() {
                    self.send(&query).await?;
                }
                deadline = Instant::now() + self.config.handshake_timeout;
            }
        }

        Ok(())
    }

    /// Read once (waiting up to the poll interval), decode, and dispatch.
    ///
    /// Returns the events produced. Decode errors are logged and skipped;
    /// a read timeout just yields no events.
    pub async fn poll(&mut self) -> Result<Vec<Event>> {
        let n = match self
            .transport
            .receive(&mut self.read_buf, self.config.poll_interval)
            .await
        {
            Ok(n) => n,
            Err(Error::Timeout) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if n == 0 {
            return Ok(Vec::new());
        }

        let result = self.state.feed(&self.read_buf[..n]);
        for error in &result.errors {
            warn!(error = %error, "decode error");
        }
        for event in &result.events {
            self.dispatch(event).await?;
        }
        Ok(result.events)
    }

    /// Keep polling until `duration` has elapsed; returns every event seen.
    pub async fn poll_for(&mut self, duration: Duration) -> Result<Vec<Event>> {
        let until = Instant::now() + duration;
        let mut events = Vec::new();
        while Instant::now() < until {
            events.extend(self.poll().await?);
        }
        Ok(events)
    }

    async fn dispatch(&mut self, event: &Event) -> Result<()> {
        self.publish(event);

        let Some(next) = self.handshake.advance(event) else {
            return Ok(());
        };
        if next == ConnectionState::Ready {
            self.finish_handshake().await
        } else if let Some(query) = handshake::query_for(next) {
            self.send(&query).await
        } else {
            Ok(())
        }
    }

    fn publish(&mut self, event: &Event) {
        let failures = self.bus.emit(event);
        self.listener_failures.extend(failures);
        // No receivers is fine.
        let _ = self.event_tx.send(event.clone());
    }

    async fn finish_handshake(&mut self) -> Result<()> {
        for port in 0..self.config.report_ports {
            self.send(&commands::cmd_report_digital(port, true)?).await?;
        }
        info!(
            version = %self.state.version(),
            firmware = self.state.firmware_name().unwrap_or("unknown"),
            pins = self.state.registry().len(),
            "board ready"
        );
        self.publish(&Event::Ready);
        Ok(())
    }

    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        debug!(frame = ?frame, "sending frame");
        self.transport.send(frame).await
    }

    // ---------------------------------------------------------------
    // Board model
    // ---------------------------------------------------------------

    /// Where the handshake stands.
    pub fn connection_state(&self) -> ConnectionState {
        self.handshake.state()
    }

    /// `true` once the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.handshake.is_ready()
    }

    pub fn version(&self) -> ProtocolVersion {
        self.state.version()
    }

    pub fn firmware_name(&self) -> Option<&str> {
        self.state.firmware_name()
    }

    pub fn firmware_version(&self) -> ProtocolVersion {
        self.state.firmware_version()
    }

    pub fn pins(&self) -> &[Pin] {
        self.state.registry().pins()
    }

    pub fn pin(&self, index: usize) -> Result<&Pin> {
        self.state.registry().get(index)
    }

    /// Analog channel → pin index.
    pub fn analog_pins(&self) -> &BTreeMap<u8, usize> {
        self.state.registry().analog_pins()
    }

    pub fn registry(&self) -> &PinRegistry {
        self.state.registry()
    }

    /// A handle to `index` that turns stale when the pins are rediscovered.
    pub fn handle(&self, index: usize) -> Result<PinHandle> {
        self.state.registry().handle(index)
    }

    pub fn resolve(&self, handle: PinHandle) -> Result<&Pin> {
        self.state.registry().resolve(handle)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub async fn report_version(&mut self) -> Result<()> {
        self.send(&commands::cmd_report_version()).await
    }

    pub async fn query_firmware(&mut self) -> Result<()> {
        self.send(&commands::cmd_query_firmware()).await
    }

    pub async fn query_capabilities(&mut self) -> Result<()> {
        self.send(&commands::cmd_query_capabilities()).await
    }

    pub async fn query_analog_mapping(&mut self) -> Result<()> {
        self.send(&commands::cmd_query_analog_mapping()).await
    }

    pub async fn query_pin_state(&mut self, pin: usize) -> Result<()> {
        self.state.registry().get(pin)?;
        self.send(&commands::cmd_query_pin_state(pin)?).await
    }

    /// Reset the board. Cached pin state is left as is.
    pub async fn reset(&mut self) -> Result<()> {
        self.send(&commands::cmd_reset()).await
    }

    // ---------------------------------------------------------------
    // Pin control
    // ---------------------------------------------------------------

    /// Set a pin's mode. The cached mode changes before the frame is sent.
    pub async fn set_pin_mode(&mut self, pin: usize, mode: PinMode) -> Result<()> {
        self.state.registry().get(pin)?;
        let frame = commands::cmd_set_pin_mode(pin, mode)?;
        let entry = self.state.registry_mut().get_mut(pin)?;
        if !entry.supports(mode) {
            debug!(pin, mode = %mode, "mode not listed in capabilities");
        }
        entry.mode = mode;
        self.send(&frame).await
    }

    /// Write one digital pin. The whole port is sent, built from the cached
    /// values of its eight pins.
    pub async fn digital_write(&mut self, pin: usize, level: PinLevel) -> Result<()> {
        self.state.registry().get(pin)?;
        let port = pin / PINS_PER_PORT;
        if port >= usize::from(MAX_PORTS) {
            return Err(Error::InvalidParameter(format!(
                "pin {pin} is beyond the last digital port"
            )));
        }
        self.state.registry_mut().get_mut(pin)?.value = level.value();
        let mask = self.state.registry().port_value(port);
        self.send(&commands::cmd_digital_port(port as u8, mask)?)
            .await
    }

    /// PWM/analog write. Pins above 15 and values above 14 bits use the
    /// extended analog sysex.
    pub async fn analog_write(&mut self, pin: usize, value: u32) -> Result<()> {
        self.state.registry().get(pin)?;
        let frame = if pin <= MAX_ANALOG_MESSAGE_PIN && value <= MAX_ANALOG_MESSAGE_VALUE {
            commands::cmd_analog_write(pin, value)?
        } else {
            commands::cmd_extended_analog(pin, value)?
        };
        self.state.registry_mut().get_mut(pin)?.value = value;
        self.send(&frame).await
    }

    /// Move a servo to `angle` degrees (same frame as an analog write).
    pub async fn servo_write(&mut self, pin: usize, angle: u32) -> Result<()> {
        self.analog_write(pin, angle).await
    }

    /// Enable or disable periodic reports for a pin: its port for
    /// [`ReportKind::Digital`], its analog channel for [`ReportKind::Analog`].
    pub async fn toggle_pin_reporting(
        &mut self,
        pin: usize,
        enabled: bool,
        kind: ReportKind,
    ) -> Result<()> {
        let entry = self.state.registry().get(pin)?;
        let frame = match kind {
            ReportKind::Digital => {
                let port = u8::try_from(pin / PINS_PER_PORT).unwrap_or(u8::MAX);
                commands::cmd_report_digital(port, enabled)?
            }
            ReportKind::Analog => {
                let channel = entry.analog_channel.ok_or_else(|| {
                    Error::InvalidParameter(format!("pin {pin} has no analog channel"))
                })?;
                commands::cmd_report_analog(channel, enabled)?
            }
        };
        self.send(&frame).await
    }

    /// Enable or disable digital and analog reporting on all 16 ports and
    /// channels.
    pub async fn set_reporting_all(&mut self, enabled: bool) -> Result<()> {
        for i in 0..MAX_PORTS {
            self.send(&commands::cmd_report_digital(i, enabled)?).await?;
            self.send(&commands::cmd_report_analog(i, enabled)?).await?;
        }
        Ok(())
    }

    pub async fn set_sampling_interval(&mut self, interval_ms: u32) -> Result<()> {
        self.send(&commands::cmd_sampling_interval(interval_ms)?)
            .await
    }

    // ---------------------------------------------------------------
    // I2C
    // ---------------------------------------------------------------

    pub async fn i2c_config(&mut self, delay_us: u32) -> Result<()> {
        self.send(&commands::cmd_i2c_config(delay_us)?).await
    }

    pub async fn i2c_write_request(&mut self, address: u16, data: &[u8]) -> Result<()> {
        self.send(&commands::cmd_i2c_write_request(address, data)?)
            .await
    }

    /// Ask for `count` bytes; the answer arrives as [`Event::I2cReply`].
    pub async fn i2c_read_request(&mut self, address: u16, count: u32) -> Result<()> {
        self.send(&commands::cmd_i2c_read_request(address, count)?)
            .await
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Register a persistent listener, see [`EventBus::on`].
    pub fn on<T, F>(&mut self, topic: T, listener: F) -> SubscriptionId
    where
        T: Into<Topic>,
        F: FnMut(&Event) -> Result<()> + Send + 'static,
    {
        self.bus.on(topic, listener)
    }

    /// Register a one-shot listener, see [`EventBus::once`].
    pub fn once<T, F>(&mut self, topic: T, listener: F) -> SubscriptionId
    where
        T: Into<Topic>,
        F: FnMut(&Event) -> Result<()> + Send + 'static,
    {
        self.bus.once(topic, listener)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.off(id)
    }

    /// Failures of `on`/`once` listeners since the last call, oldest first.
    /// Each is also logged when it happens.
    pub fn take_listener_failures(&mut self) -> Vec<ListenerFailure> {
        std::mem::take(&mut self.listener_failures)
    }

    /// Receive every event on a broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Close the transport. The board model is kept for inspection.
    pub async fn close(&mut self) -> Result<()> {
        info!("closing board");
        self.handshake.reset();
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BoardBuilder;
    use crate::state::fixtures::*;
    use firmata_core::EventKind;
    use firmata_test_harness::MockTransport;
    use std::sync::{Arc, Mutex};

    /// A mock that answers the four handshake queries.
    fn scripted_board() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.expect(&[0xF9], &[0xF9, 0x02, 0x05]);
        mock.expect(&[0xF0, 0x79, 0xF7], &firmware_response());
        mock.expect(&[0xF0, 0x6B, 0xF7], &capability_response());
        mock.expect(&[0xF0, 0x69, 0xF7], &analog_mapping_response());
        mock
    }

    async fn board_with(mock: &MockTransport) -> Board {
        BoardBuilder::new()
            .poll_interval(Duration::from_millis(10))
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap()
    }

    async fn connected() -> (Board, MockTransport) {
        let mut mock = scripted_board();
        let mut board = board_with(&mock).await;
        board.connect().await.unwrap();
        mock.clear_sent();
        (board, mock)
    }

    #[tokio::test(start_paused = true)]
    async fn connect_runs_full_handshake() {
        let mock = scripted_board();
        let mut board = board_with(&mock).await;
        let mut rx = board.subscribe();

        board.connect().await.unwrap();

        assert!(board.is_ready());
        assert_eq!(board.version(), ProtocolVersion { major: 2, minor: 5 });
        assert_eq!(board.firmware_name(), Some("StandardFirmata"));
        assert_eq!(board.pins().len(), 20);
        assert_eq!(board.analog_pins().len(), 6);
        assert_eq!(mock.remaining_expectations(), 0);

        // Queries in order, then digital reporting on ports 0 and 1.
        assert_eq!(
            mock.sent_data(),
            vec![
                vec![0xF9],
                vec![0xF0, 0x79, 0xF7],
                vec![0xF0, 0x6B, 0xF7],
                vec![0xF0, 0x69, 0xF7],
                vec![0xD0, 0x01],
                vec![0xD1, 0x01],
            ]
        );

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::ReportVersion,
                EventKind::FirmwareName,
                EventKind::CapabilityQuery,
                EventKind::AnalogMappingQuery,
                EventKind::Ready,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ready_listener_fires_once() {
        let mock = scripted_board();
        let mut board = board_with(&mock).await;
        let count = Arc::new(Mutex::new(0));
        let seen = count.clone();
        board.once(EventKind::Ready, move |_| {
            *seen.lock().unwrap() += 1;
            Ok(())
        });

        board.connect().await.unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_board_times_out_after_retries() {
        let mock = MockTransport::new();
        let mut board = BoardBuilder::new()
            .handshake_timeout(Duration::from_millis(500))
            .max_retries(2)
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        let err = board.connect().await.unwrap_err();
        assert!(matches!(
            err,
            Error::HandshakeTimeout {
                state: ConnectionState::AwaitingVersion
            }
        ));
        // One initial send plus two retries.
        assert_eq!(mock.sent_data(), vec![vec![0xF9]; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_a_lost_answer() {
        let mut mock = MockTransport::new();
        // The first version query goes unanswered.
        mock.expect(&[0xF9], &[]);
        mock.expect(&[0xF9], &[0xF9, 0x02, 0x05]);
        mock.expect(&[0xF0, 0x79, 0xF7], &firmware_response());
        mock.expect(&[0xF0, 0x6B, 0xF7], &capability_response());
        mock.expect(&[0xF0, 0x69, 0xF7], &analog_mapping_response());

        let mut board = board_with(&mock).await;
        board.connect().await.unwrap();
        assert!(board.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_step_reports_its_state() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xF9], &[0xF9, 0x02, 0x05]);
        mock.expect(&[0xF0, 0x79, 0xF7], &firmware_response());

        let mut board = board_with(&mock).await;
        let err = board.connect().await.unwrap_err();
        assert!(matches!(
            err,
            Error::HandshakeTimeout {
                state: ConnectionState::AwaitingCapabilities
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn set_pin_mode_updates_registry_before_send() {
        let (mut board, mock) = connected().await;

        board.set_pin_mode(13, PinMode::Input).await.unwrap();
        assert_eq!(board.pin(13).unwrap().mode, PinMode::Input);
        assert_eq!(mock.sent_data(), vec![vec![0xF4, 0x0D, 0x00]]);
    }

    #[tokio::test(start_paused = true)]
    async fn set_pin_mode_out_of_range() {
        let (mut board, mock) = connected().await;
        let err = board.set_pin_mode(20, PinMode::Output).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRangePin { pin: 20, count: 20 }));
        assert!(mock.sent_data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pin_control_past_the_registry_is_out_of_range() {
        let (mut board, mock) = connected().await;

        let err = board.set_pin_mode(200, PinMode::Output).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRangePin { pin: 200, count: 20 }));
        let err = board.digital_write(200, PinLevel::High).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRangePin { pin: 200, count: 20 }));
        let err = board.analog_write(200, 1).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRangePin { pin: 200, count: 20 }));
        let err = board.query_pin_state(200).await.unwrap_err();
        assert!(matches!(err, Error::OutOfRangePin { pin: 200, count: 20 }));
        assert!(mock.sent_data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_pin_mode_then_pin_state_response() {
        let (mut board, mut mock) = connected().await;

        board.set_pin_mode(9, PinMode::Pwm).await.unwrap();
        mock.expect(&[0xF0, 0x6D, 0x09, 0xF7], &[0xF0, 0x6E, 0x09, 0x03, 0x00, 0xF7]);
        board.query_pin_state(9).await.unwrap();

        let events = board.poll().await.unwrap();
        assert_eq!(
            events,
            vec![Event::PinState {
                pin: 9,
                mode: PinMode::Pwm,
                value: 0
            }]
        );
        assert_eq!(board.pin(9).unwrap().mode, PinMode::Pwm);
    }

    #[tokio::test(start_paused = true)]
    async fn digital_writes_on_one_port_keep_each_other() {
        let (mut board, mock) = connected().await;

        board.digital_write(13, PinLevel::High).await.unwrap();
        board.digital_write(12, PinLevel::Low).await.unwrap();
        board.digital_write(8, PinLevel::High).await.unwrap();

        assert_eq!(board.pin(13).unwrap().value, 1);
        assert_eq!(board.pin(12).unwrap().value, 0);
        assert_eq!(
            mock.sent_data(),
            vec![
                vec![0x91, 0x20, 0x00],
                vec![0x91, 0x20, 0x00],
                vec![0x91, 0x21, 0x00],
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn digital_write_order_does_not_matter() {
        let (mut a, _) = connected().await;
        let (mut b, _) = connected().await;

        a.digital_write(2, PinLevel::High).await.unwrap();
        a.digital_write(3, PinLevel::Low).await.unwrap();
        b.digital_write(3, PinLevel::Low).await.unwrap();
        b.digital_write(2, PinLevel::High).await.unwrap();

        for board in [&a, &b] {
            assert_eq!(board.pin(2).unwrap().value, 1);
            assert_eq!(board.pin(3).unwrap().value, 0);
            assert_eq!(board.registry().port_value(0), 0b0000_0100);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn analog_write_picks_frame_by_pin() {
        let (mut board, mock) = connected().await;

        board.analog_write(9, 128).await.unwrap();
        board.analog_write(18, 128).await.unwrap();
        assert_eq!(board.pin(18).unwrap().value, 128);
        assert_eq!(
            mock.sent_data(),
            vec![vec![0xE9, 0x00, 0x01], vec![0xF0, 0x6F, 18, 0x00, 0x01, 0xF7]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_reporting_targets_port_or_channel() {
        let (mut board, mock) = connected().await;

        board
            .toggle_pin_reporting(10, true, ReportKind::Digital)
            .await
            .unwrap();
        board
            .toggle_pin_reporting(15, true, ReportKind::Analog)
            .await
            .unwrap();
        let err = board
            .toggle_pin_reporting(10, true, ReportKind::Analog)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));

        assert_eq!(mock.sent_data(), vec![vec![0xD1, 0x01], vec![0xC1, 0x01]]);
    }

    #[tokio::test(start_paused = true)]
    async fn reporting_all_covers_sixteen_ports() {
        let (mut board, mock) = connected().await;
        board.set_reporting_all(false).await.unwrap();

        let sent = mock.sent_data();
        assert_eq!(sent.len(), 32);
        assert_eq!(sent[0], vec![0xD0, 0x00]);
        assert_eq!(sent[31], vec![0xCF, 0x00]);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_dispatches_to_pin_topic() {
        let (mut board, mut mock) = connected().await;
        board.set_pin_mode(2, PinMode::Input).await.unwrap();

        let hits = Arc::new(Mutex::new(Vec::new()));
        let log = hits.clone();
        board.on(Topic::DigitalPin(2), move |event| {
            log.lock().unwrap().push(event.clone());
            Ok(())
        });

        mock.feed(&[0x90, 0x04, 0x00]);
        board.poll().await.unwrap();

        assert_eq!(
            *hits.lock().unwrap(),
            vec![Event::DigitalRead { pin: 2, value: 1 }]
        );
        assert_eq!(board.pin(2).unwrap().value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listener_does_not_break_polling() {
        let (mut board, mut mock) = connected().await;
        board.on(EventKind::AnalogRead, |_| {
            Err(Error::Listener("bad listener".into()))
        });

        mock.feed(&[0xE0, 0x10, 0x00, 0xE1, 0x20, 0x00]);
        let events = board.poll().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(board.pin(15).unwrap().value, 0x20);

        let failures = board.take_listener_failures();
        assert_eq!(failures.len(), 2);
        assert!(
            failures
                .iter()
                .all(|f| f.topic == Topic::Kind(EventKind::AnalogRead)
                    && matches!(f.error, Error::Listener(_)))
        );
        assert!(board.take_listener_failures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn decode_errors_do_not_stop_polling() {
        let (mut board, mut mock) = connected().await;
        mock.feed(&[0xA0, 0xF0, 0x79, 0xF9, 0x02, 0x06]);
        let events = board.poll().await.unwrap();
        assert_eq!(
            events,
            vec![Event::ReportVersion {
                version: ProtocolVersion { major: 2, minor: 6 }
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn i2c_requests_and_reply() {
        let (mut board, mut mock) = connected().await;

        board.i2c_config(0).await.unwrap();
        board.i2c_write_request(0x52, &[0x40, 0x00]).await.unwrap();
        board.i2c_read_request(0x52, 6).await.unwrap();
        assert_eq!(mock.sent_data().len(), 3);

        mock.feed(&[0xF0, 0x77, 0x52, 0x00, 0x00, 0x00, 0x7F, 0x00, 0xF7]);
        let events = board.poll().await.unwrap();
        assert_eq!(
            events,
            vec![Event::I2cReply {
                address: 0x52,
                register: 0,
                data: vec![0x7F]
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rediscovery_invalidates_handles() {
        let (mut board, mut mock) = connected().await;
        let handle = board.handle(13).unwrap();
        assert!(board.resolve(handle).is_ok());

        mock.expect(&[0xF0, 0x6B, 0xF7], &capability_response());
        board.query_capabilities().await.unwrap();
        board.poll().await.unwrap();

        assert!(matches!(
            board.resolve(handle),
            Err(Error::StalePin { pin: 13, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_for_collects_events() {
        let (mut board, mut mock) = connected().await;
        mock.feed(&[0xE0, 0x01, 0x00]);
        mock.feed(&[0xE0, 0x02, 0x00]);
        let events = board.poll_for(Duration::from_millis(50)).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_the_transport() {
        let (mut board, mock) = connected().await;
        board.close().await.unwrap();
        assert!(!mock.is_connected());
        assert_eq!(board.connection_state(), ConnectionState::Disconnected);
        assert!(matches!(
            board.digital_write(13, PinLevel::High).await,
            Err(Error::NotConnected)
        ));
        // The model survives for inspection.
        assert_eq!(board.pins().len(), 20);
    }
}
