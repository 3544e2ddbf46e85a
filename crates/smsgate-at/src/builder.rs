//! GsmModemBuilder -- fluent builder for constructing [`GsmModem`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters and protocol timing before the modem is used.
//! Building performs no I/O: the port is opened afresh by every operation.
//!
//! # Example
//!
//! ```no_run
//! use smsgate_at::GsmModemBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> smsgate_core::Result<()> {
//! let modem = GsmModemBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(115_200)
//!     .submit_deadline(Duration::from_secs(45))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use smsgate_core::error::{Error, Result};
use smsgate_core::transport::Connector;
use smsgate_transport::{SerialConfig, SerialConnector};

use crate::io::AtTiming;
use crate::modem::GsmModem;

/// Default baud rate for USB GSM modems.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Fluent builder for [`GsmModem`].
#[derive(Debug, Clone)]
pub struct GsmModemBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    timing: AtTiming,
}

impl GsmModemBuilder {
    pub fn new() -> Self {
        GsmModemBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            timing: AtTiming::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Replace all timing parameters at once.
    pub fn timing(mut self, timing: AtTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Intrinsic read timeout set on the port (default: 200ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timing.read_timeout = timeout;
        self
    }

    /// Deadline for an ordinary command response (default: 3s).
    pub fn command_deadline(mut self, deadline: Duration) -> Self {
        self.timing.command_deadline = deadline;
        self
    }

    /// Deadline for the network to accept a message (default: 30s).
    pub fn submit_deadline(mut self, deadline: Duration) -> Self {
        self.timing.submit_deadline = deadline;
        self
    }

    /// Build a [`GsmModem`] with a caller-provided connector.
    ///
    /// This is the entry point for testing (pass a `MockConnector` from
    /// `smsgate-test-harness`).
    pub fn build_with_connector(self, connector: Box<dyn Connector>) -> Result<GsmModem> {
        if self.timing.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be non-zero".into(),
            ));
        }
        Ok(GsmModem::new(connector, self.timing))
    }

    /// Build a [`GsmModem`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub fn build(self) -> Result<GsmModem> {
        let port = self
            .serial_port
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let config = SerialConfig {
            baud_rate: self.baud_rate,
            read_timeout: self.timing.read_timeout,
        };
        let connector = SerialConnector::with_config(port, config);
        self.build_with_connector(Box::new(connector))
    }
}

impl Default for GsmModemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
