//! Read a Wii Nunchuck over I2C.
//!
//! Initialises the nunchuck at address 0x52, then repeatedly zeroes its
//! register pointer and reads the six data bytes (joystick, accelerometer,
//! buttons), printing each reply.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p firmata --example i2c_read -- /dev/ttyACM0
//! ```

use std::time::Duration;

use anyhow::Context;
use firmata::{BoardBuilder, Event};

const NUNCHUCK_ADDRESS: u16 = 0x52;

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

    println!(
        "Firmware {} / protocol {}",
        board.firmware_name().unwrap_or("unknown"),
        board.version()
    );

    let mut events = board.subscribe();

    board.i2c_config(0).await?;
    board.i2c_write_request(NUNCHUCK_ADDRESS, &[0x40, 0x00]).await?;

    loop {
        board.i2c_write_request(NUNCHUCK_ADDRESS, &[0x00]).await?;
        board.i2c_read_request(NUNCHUCK_ADDRESS, 6).await?;
        board.poll_for(Duration::from_millis(200)).await?;

        while let Ok(event) = events.try_recv() {
            if let Event::I2cReply { address, data, .. } = event {
                println!("0x{address:02X}: {data:?}");
            }
        }
    }
}
