//! TCP transport for boards reachable over the network.
//!
//! Firmata boards show up on TCP in two ways: WiFi/Ethernet firmata
//! firmwares (ESP8266/ESP32 `StandardFirmataWiFi`, `StandardFirmataEthernet`)
//! listening on port 3030, and serial boards bridged by a serial-to-TCP
//! server such as `ser2net`.
//!
//! # Example
//!
//! ```no_run
//! use firmata_transport::TcpTransport;
//! use firmata_core::transport::Transport;
//!
//! # async fn example() -> firmata_core::Result<()> {
//! let mut transport = TcpTransport::connect("192.168.1.50:3030").await?;
//! transport.send(&[0xF9]).await?;
//! # Ok(())
//! # }
//! ```

use firmata_core::error::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;

use crate::stream::StreamTransport;

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport: a [`StreamTransport`] over a [`TcpStream`].
pub type TcpTransport = StreamTransport<TcpStream>;

impl StreamTransport<TcpStream> {
    /// Connect to a `host:port` endpoint using the default timeout.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to a `host:port` endpoint, giving up after `timeout`.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %addr, "TCP connection timed out");
                Error::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %addr, error = %e, "TCP connection failed");
                map_connect_error(e, addr)
            })?;

        // Firmata frames are 1-3 bytes; don't let Nagle batch them.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %addr, "TCP connection established");

        Ok(StreamTransport::new(stream, addr))
    }

    /// Address string this transport was connected to.
    pub fn addr(&self) -> &str {
        self.label()
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Transport(format!("connection refused: {}", addr))
        }
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmata_core::transport::Transport;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn connect_and_answer_version_query() {
        let (listener, addr) = test_listener().await;

        // A fake board that answers REPORT_VERSION with 2.5.
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], &[0xF9]);
            stream.write_all(&[0xF9, 0x02, 0x05]).await.unwrap();
            stream.flush().await.unwrap();
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.addr(), addr);

        transport.send(&[0xF9]).await.unwrap();

        let mut buf = [0u8; 16];
        let n = transport
            .receive(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0xF9, 0x02, 0x05]);

        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpTransport::connect(&addr).await.unwrap_err();
        match &err {
            Error::Transport(msg) => assert!(msg.contains("connection refused"), "got: {msg}"),
            other => panic!("expected Transport error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn peer_close_is_detected() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        server.await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut buf = [0u8; 16];
        let result = transport.receive(&mut buf, Duration::from_secs(2)).await;
        assert!(
            matches!(result, Err(Error::ConnectionLost)),
            "expected ConnectionLost, got: {:?}",
            result
        );
    }
}
