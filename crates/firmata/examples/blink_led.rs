//! Blink an LED.
//!
//! Connects to a board running StandardFirmata, runs the handshake, and
//! toggles pin 13 (the on-board LED on most Arduinos) ten times.
//!
//! # Requirements
//!
//! - An Arduino flashed with StandardFirmata
//! - The serial port path adjusted for your system (e.g. `/dev/ttyACM0`
//!   on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p firmata --example blink_led -- /dev/ttyACM0
//! ```

use std::time::Duration;

use anyhow::Context;
use firmata::{BoardBuilder, PinLevel, PinMode};

const LED_PIN: usize = 13;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let serial_port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    println!("Connecting to {}...", serial_port);

    let mut board = BoardBuilder::new()
        .serial_port(&serial_port)
        .build()
        .await
        .with_context(|| format!("opening {serial_port}"))?;

    // Opening the port resets most Arduinos; give the bootloader time.
    tokio::time::sleep(Duration::from_secs(2)).await;
    board.connect().await.context("handshake failed")?;

    println!(
        "Connected: {} (protocol {})",
        board.firmware_name().unwrap_or("unknown firmware"),
        board.version()
    );

    board.set_pin_mode(LED_PIN, PinMode::Output).await?;

    for _ in 0..10 {
        board.digital_write(LED_PIN, PinLevel::High).await?;
        println!("LED on");
        tokio::time::sleep(Duration::from_millis(500)).await;

        board.digital_write(LED_PIN, PinLevel::Low).await?;
        println!("LED off");
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    board.close().await?;
    Ok(())
}
