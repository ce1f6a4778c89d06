//! Blink an LED on a network board.
//!
//! Same as `blink_led`, but over TCP: either an ESP board running
//! StandardFirmataWiFi (port 3030) or a serial board behind a
//! serial-to-TCP bridge such as ser2net.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p firmata --example tcp_blink -- 192.168.1.50:3030
//! ```

use std::time::Duration;

use anyhow::Context;
use firmata::{BoardBuilder, PinLevel, PinMode, TcpTransport};

const LED_PIN: usize = 13;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.1.50:3030".to_string());

    println!("Connecting to {}...", addr);

    let transport = TcpTransport::connect(&addr)
        .await
        .with_context(|| format!("connecting to {addr}"))?;

    let mut board = BoardBuilder::new()
        .handshake_timeout(Duration::from_secs(5))
        .build_with_transport(Box::new(transport))
        .await?;
    board.connect().await.context("handshake failed")?;

    println!(
        "Connected: {} with {} pins",
        board.firmware_name().unwrap_or("unknown firmware"),
        board.pins().len()
    );

    board.set_pin_mode(LED_PIN, PinMode::Output).await?;

    for i in 0..20 {
        let level = if i % 2 == 0 { PinLevel::High } else { PinLevel::Low };
        board.digital_write(LED_PIN, level).await?;
        println!("LED {level}");
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    board.close().await?;
    Ok(())
}
