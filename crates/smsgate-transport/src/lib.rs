//! Transport implementations for smsgate.
//!
//! This crate provides the serial implementation of the
//! [`Transport`](smsgate_core::Transport) and
//! [`Connector`](smsgate_core::Connector) traits from `smsgate-core`.
//!
//! # Example
//!
//! ```no_run
//! use smsgate_transport::SerialConnector;
//! use smsgate_core::Connector;
//!
//! # async fn example() -> smsgate_core::Result<()> {
//! let connector = SerialConnector::new("/dev/ttyUSB0", 115_200);
//! let mut transport = connector.connect().await?;
//! transport.send(b"AT\r").await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DEFAULT_READ_TIMEOUT, SerialConfig, SerialConnector, SerialTransport};
