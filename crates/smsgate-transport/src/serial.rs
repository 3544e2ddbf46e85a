//! Serial port transport for modem communication.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait for USB virtual COM ports and physical RS-232 links,
//! and [`SerialConnector`], which opens a fresh transport per operation.
//!
//! GSM modems (SIM800, SIM7600, Quectel EC2x, Huawei sticks) almost always
//! present as 8N1 with no flow control; only the baud rate varies.
//!
//! # Example
//!
//! ```no_run
//! use smsgate_transport::SerialTransport;
//! use smsgate_core::transport::Transport;
//!
//! # async fn example() -> smsgate_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 115_200).await?;
//! transport.send(b"AT\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use smsgate_core::error::{Error, Result};
use smsgate_core::transport::{Connector, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Intrinsic read timeout applied to every serial read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Serial port configuration.
///
/// Framing is always 8N1 with no flow control; only the baud rate and the
/// per-read timeout vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate (e.g., 9600, 57600, 115200)
    pub baud_rate: u32,
    /// How long a single read waits for data before reporting a timeout.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Serial port transport to a modem.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging
    port_name: String,
    read_timeout: Duration,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default 8N1 settings.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate (e.g., 9600, 115200)
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, &config).await
    }

    /// Open a serial port at 8N1 with the given baud rate and read timeout.
    pub async fn open_with_config(port: &str, config: &SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            read_timeout_ms = config.read_timeout.as_millis(),
            "Opening serial port"
        );

        let serial_stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {}: {}", port, e))
            })?;

        tracing::debug!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
            read_timeout: config.read_timeout,
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = %String::from_utf8_lossy(data).escape_debug(),
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            Error::Io(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(self.read_timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = %String::from_utf8_lossy(&buf[..n]).escape_debug(),
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => Err(Error::Timeout),
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            tracing::debug!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// Opens a new [`SerialTransport`] for every modem operation.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port_name: String,
    config: SerialConfig,
}

impl SerialConnector {
    /// Connector for `port_name` at `baud_rate` with default 8N1 framing.
    pub fn new(port_name: &str, baud_rate: u32) -> Self {
        Self::with_config(
            port_name,
            SerialConfig {
                baud_rate,
                ..Default::default()
            },
        )
    }

    /// Connector with an explicit baud rate and read timeout.
    pub fn with_config(port_name: &str, config: SerialConfig) -> Self {
        SerialConnector {
            port_name: port_name.to_string(),
            config,
        }
    }

    /// The serial configuration applied on every open.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for SerialConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let transport = SerialTransport::open_with_config(&self.port_name, &self.config).await?;
        Ok(Box::new(transport))
    }

    fn endpoint(&self) -> &str {
        &self.port_name
    }
}
