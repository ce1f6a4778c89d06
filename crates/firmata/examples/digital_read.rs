//! Watch a push button.
//!
//! Puts pin 2 in INPUT mode, enables reporting for its port, and prints
//! every level change the board reports for the next 30 seconds.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p firmata --example digital_read -- /dev/ttyACM0
//! ```

use std::time::Duration;

use anyhow::Context;
use firmata::{BoardBuilder, Event, PinMode, ReportKind, Topic};

const BUTTON_PIN: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let serial_port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyACM0".to_string());

    let mut board = BoardBuilder::new()
        .serial_port(&serial_port)
        .build()
        .await
        .with_context(|| format!("opening {serial_port}"))?;
    tokio::time::sleep(Duration::from_secs(2)).await;
    board.connect().await.context("handshake failed")?;

    board.set_pin_mode(BUTTON_PIN, PinMode::Input).await?;
    board
        .toggle_pin_reporting(BUTTON_PIN, true, ReportKind::Digital)
        .await?;

    let mut last = None;
    board.on(Topic::DigitalPin(BUTTON_PIN), move |event| {
        if let Event::DigitalRead { pin, value } = event {
            // Reports cover the whole port; only print actual changes.
            if last != Some(*value) {
                println!("pin {pin}: {}", if *value == 0 { "LOW" } else { "HIGH" });
                last = Some(*value);
            }
        }
        Ok(())
    });

    println!("Watching pin {BUTTON_PIN} for 30 seconds...");
    board.poll_for(Duration::from_secs(30)).await?;

    board.close().await?;
    Ok(())
}
