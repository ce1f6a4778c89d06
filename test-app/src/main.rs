// firmata test application -- CLI tool for exercising a Firmata board over
// a serial port, a TCP socket, or a scripted mock transport.
//
// Usage:
//   firmata-test-app --port /dev/ttyACM0 info
//   firmata-test-app --mock info
//   firmata-test-app --port /dev/ttyACM0 blink --pin 13 --count 10
//   firmata-test-app --tcp 192.168.1.50:3030 monitor --pin 2
//   firmata-test-app --port /dev/ttyACM0 monitor --pin 14 --analog --duration 0
//   firmata-test-app --port /dev/ttyACM0 pin-state --pin 13
//   firmata-test-app --port /dev/ttyACM0 i2c-read --address 0x52 --register 0 --count 6
//
// Logging follows RUST_LOG; --verbose forces debug output.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use firmata::protocol::commands;
use firmata::{
    Board, BoardBuilder, Event, PinLevel, PinMode, ReportKind, TcpTransport,
};
use firmata_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// firmata test application -- drives a Firmata board from the command line.
#[derive(Parser)]
#[command(name = "firmata-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM3).
    #[arg(long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = firmata::transport::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Connect to a network board at host:port instead of a serial port.
    #[arg(long, conflicts_with = "mock")]
    tcp: Option<String>,

    /// Use a scripted mock board instead of real hardware.
    #[arg(long)]
    mock: bool,

    /// Seconds to wait after opening a serial port before the handshake.
    /// Most Arduinos reset when the port opens.
    #[arg(long, default_value_t = 2)]
    startup_delay: u64,

    /// Handshake step timeout in milliseconds.
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Enable debug logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Parse an I2C address given as hex (`0x52`, `52`).
fn parse_hex_u16(s: &str) -> std::result::Result<u16, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(s, 16).map_err(|e| format!("invalid hex address: {e}"))
}

#[derive(Subcommand)]
enum Command {
    /// Print protocol version, firmware and the discovered pin table.
    Info,

    /// Toggle a digital output.
    Blink {
        /// Pin to drive (13 is the on-board LED of most Arduinos).
        #[arg(long, default_value_t = 13)]
        pin: usize,

        /// Number of on/off cycles.
        #[arg(long, default_value_t = 5)]
        count: u32,

        /// Half-period in milliseconds.
        #[arg(long, default_value_t = 500)]
        interval: u64,
    },

    /// Print value changes reported for one pin.
    Monitor {
        #[arg(long)]
        pin: usize,

        /// Watch the pin's analog channel instead of its digital level.
        #[arg(long)]
        analog: bool,

        /// Seconds to run; 0 runs until Ctrl-C.
        #[arg(long, default_value_t = 10)]
        duration: u64,
    },

    /// Ask the board for one pin's mode and value.
    PinState {
        #[arg(long)]
        pin: usize,
    },

    /// Read bytes from an I2C device register.
    I2cRead {
        /// Device address in hex (e.g. 0x52); 10-bit addresses go up to 0x3FF.
        #[arg(long, value_parser = parse_hex_u16)]
        address: u16,

        /// Register to read from.
        #[arg(long, default_value_t = 0)]
        register: u8,

        /// Number of bytes to read.
        #[arg(long, default_value_t = 6)]
        count: u32,
    },
}

// ---------------------------------------------------------------------------
// Mock board
// ---------------------------------------------------------------------------

/// Capability reply of an Uno-style board: 20 pins, PWM on 3/5/6/9/10/11,
/// analog on 14-19, pins 0-1 reserved for the serial port.
fn mock_capability_response() -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x6C];
    for pin in 0..20u8 {
        if pin >= 2 {
            bytes.extend([0x00, 0x01, 0x01, 0x01, 0x0B, 0x01, 0x04, 0x0E]);
        }
        if [3, 5, 6, 9, 10, 11].contains(&pin) {
            bytes.extend([0x03, 0x08]);
        }
        if pin >= 14 {
            bytes.extend([0x02, 0x0A]);
        }
        if pin == 18 || pin == 19 {
            bytes.extend([0x06, 0x01]);
        }
        bytes.push(0x7F);
    }
    bytes.push(0xF7);
    bytes
}

fn mock_analog_mapping_response() -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x6A];
    bytes.extend([0x7F; 14]);
    bytes.extend(0..6u8);
    bytes.push(0xF7);
    bytes
}

fn mock_firmware_response() -> Vec<u8> {
    let mut bytes = vec![0xF0, 0x79, 0x02, 0x05];
    for c in "MockFirmata".bytes() {
        bytes.extend([c & 0x7F, c >> 7]);
    }
    bytes.push(0xF7);
    bytes
}

/// A mock that answers the connection handshake, plus a pin-state query
/// for `pin_state` when given.
fn mock_transport(pin_state: Option<usize>) -> Result<MockTransport> {
    let mut mock = MockTransport::new();
    mock.expect(&commands::cmd_report_version(), &[0xF9, 0x02, 0x05]);
    mock.expect(&commands::cmd_query_firmware(), &mock_firmware_response());
    mock.expect(
        &commands::cmd_query_capabilities(),
        &mock_capability_response(),
    );
    mock.expect(
        &commands::cmd_query_analog_mapping(),
        &mock_analog_mapping_response(),
    );
    if let Some(pin) = pin_state {
        let pin_byte = u8::try_from(pin).context("pin out of range")?;
        mock.expect(
            &commands::cmd_query_pin_state(pin)?,
            &[0xF0, 0x6E, pin_byte, PinMode::Output.code(), 0x00, 0xF7],
        );
    }
    Ok(mock)
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

async fn create_board(cli: &Cli) -> Result<Board> {
    let builder = BoardBuilder::new()
        .baud_rate(cli.baud)
        .handshake_timeout(Duration::from_millis(cli.timeout_ms));

    let mut board = if cli.mock {
        let pin_state = match &cli.command {
            Command::PinState { pin } => Some(*pin),
            _ => None,
        };
        let board = builder
            .build_with_transport(Box::new(mock_transport(pin_state)?))
            .await
            .context("failed to build board with mock transport")?;
        println!("Connected (mock transport)");
        board
    } else if let Some(addr) = &cli.tcp {
        let transport = TcpTransport::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {addr}"))?;
        let board = builder
            .build_with_transport(Box::new(transport))
            .await
            .context("failed to build board")?;
        println!("Connected to {addr}");
        board
    } else {
        let board = builder
            .serial_port(&cli.port)
            .build()
            .await
            .with_context(|| {
                format!("failed to open serial port {} at {} baud", cli.port, cli.baud)
            })?;
        println!("Connected to {} at {} baud", cli.port, cli.baud);
        if cli.startup_delay > 0 {
            debug!(seconds = cli.startup_delay, "waiting for the board to reset");
            tokio::time::sleep(Duration::from_secs(cli.startup_delay)).await;
        }
        board
    };

    board.connect().await.context("handshake failed")?;
    Ok(board)
}

/// Poll until `pick` accepts an event or `timeout` passes.
async fn wait_for<T>(
    board: &mut Board,
    timeout: Duration,
    mut pick: impl FnMut(&Event) -> Option<T>,
) -> Result<Option<T>> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        for event in board.poll().await? {
            if let Some(found) = pick(&event) {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_info(board: &Board) -> Result<()> {
    println!("Protocol version: {}", board.version());
    println!(
        "Firmware:         {} {}",
        board.firmware_name().unwrap_or("unknown"),
        board.firmware_version()
    );
    println!("Pins:             {}", board.pins().len());
    println!("Analog channels:  {}", board.analog_pins().len());
    println!();
    println!("{:>4}  {:>6}  {:<8}  modes", "pin", "analog", "mode");
    for pin in board.pins() {
        let analog = pin
            .analog_channel
            .map(|ch| format!("A{ch}"))
            .unwrap_or_else(|| "-".into());
        let modes: Vec<String> = pin.supported_modes.iter().map(|m| m.to_string()).collect();
        let modes = if modes.is_empty() {
            "(unavailable)".to_string()
        } else {
            modes.join(", ")
        };
        println!("{:>4}  {:>6}  {:<8}  {}", pin.index, analog, pin.mode, modes);
    }
    Ok(())
}

async fn cmd_blink(board: &mut Board, pin: usize, count: u32, interval_ms: u64) -> Result<()> {
    board
        .set_pin_mode(pin, PinMode::Output)
        .await
        .with_context(|| format!("failed to set pin {pin} to OUTPUT"))?;

    let half_period = Duration::from_millis(interval_ms);
    for i in 0..count {
        board.digital_write(pin, PinLevel::High).await?;
        tokio::time::sleep(half_period).await;
        board.digital_write(pin, PinLevel::Low).await?;
        tokio::time::sleep(half_period).await;
        info!(cycle = i + 1, count, "blink");
    }
    println!("Blinked pin {pin} {count} times");
    Ok(())
}

async fn cmd_monitor(board: &mut Board, pin: usize, analog: bool, duration_secs: u64) -> Result<()> {
    let channel = if analog {
        let channel = board
            .pin(pin)?
            .analog_channel
            .with_context(|| format!("pin {pin} has no analog channel"))?;
        board.set_pin_mode(pin, PinMode::Analog).await?;
        board.toggle_pin_reporting(pin, true, ReportKind::Analog).await?;
        Some(channel)
    } else {
        board.set_pin_mode(pin, PinMode::Input).await?;
        board.toggle_pin_reporting(pin, true, ReportKind::Digital).await?;
        None
    };

    match duration_secs {
        0 => println!("Monitoring pin {pin} (Ctrl-C to stop)..."),
        n => println!("Monitoring pin {pin} for {n}s..."),
    }

    let start = tokio::time::Instant::now();
    let limit = (duration_secs > 0).then(|| Duration::from_secs(duration_secs));
    let mut last: Option<u32> = None;

    loop {
        if limit.is_some_and(|limit| start.elapsed() >= limit) {
            break;
        }
        let events = tokio::select! {
            events = board.poll() => events?,
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted");
                break;
            }
        };
        for event in events {
            let value = match (&event, channel) {
                (Event::AnalogRead { channel: ch, value }, Some(want)) if *ch == want => *value,
                (Event::DigitalRead { pin: p, value }, None) if *p == pin => *value,
                _ => continue,
            };
            if last != Some(value) {
                let t = start.elapsed().as_secs_f64();
                match channel {
                    Some(ch) => println!("[{t:>8.3}s] A{ch} = {value}"),
                    None => println!("[{t:>8.3}s] pin {pin} = {}", PinLevel::from(value != 0)),
                }
                last = Some(value);
            }
        }
    }

    let kind = if analog {
        ReportKind::Analog
    } else {
        ReportKind::Digital
    };
    board.toggle_pin_reporting(pin, false, kind).await?;
    Ok(())
}

async fn cmd_pin_state(board: &mut Board, pin: usize, timeout: Duration) -> Result<()> {
    board.query_pin_state(pin).await?;
    let reply = wait_for(board, timeout, |event| match event {
        Event::PinState { pin: p, mode, value } if *p == pin => Some((*mode, *value)),
        _ => None,
    })
    .await?;

    let Some((mode, value)) = reply else {
        bail!("no pin state reply for pin {pin}");
    };
    println!("Pin {pin}: mode {mode}, value {value}");
    Ok(())
}

async fn cmd_i2c_read(
    board: &mut Board,
    address: u16,
    register: u8,
    count: u32,
    timeout: Duration,
) -> Result<()> {
    board.i2c_config(0).await?;
    board
        .i2c_write_request(address, &[register])
        .await
        .context("failed to select register")?;
    board.i2c_read_request(address, count).await?;

    let reply = wait_for(board, timeout, |event| match event {
        Event::I2cReply { address: a, data, .. } if *a == address => Some(data.clone()),
        _ => None,
    })
    .await?;

    let Some(data) = reply else {
        bail!("no I2C reply from device 0x{address:02X}");
    };
    let hex: Vec<String> = data.iter().map(|b| format!("{b:02X}")).collect();
    println!("0x{address:02X}[{register}]: {}", hex.join(" "));
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut board = create_board(&cli).await?;
    let timeout = Duration::from_millis(cli.timeout_ms);

    let result = match &cli.command {
        Command::Info => cmd_info(&board),
        Command::Blink {
            pin,
            count,
            interval,
        } => cmd_blink(&mut board, *pin, *count, *interval).await,
        Command::Monitor {
            pin,
            analog,
            duration,
        } => cmd_monitor(&mut board, *pin, *analog, *duration).await,
        Command::PinState { pin } => cmd_pin_state(&mut board, *pin, timeout).await,
        Command::I2cRead {
            address,
            register,
            count,
        } => cmd_i2c_read(&mut board, *address, *register, *count, timeout).await,
    };

    board.close().await.ok();
    result
}
