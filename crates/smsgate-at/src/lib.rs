//! smsgate-at: AT-command protocol engine for GSM modems.
//!
//! The engine drives text-mode SMS over a half-duplex, line-oriented serial
//! link with no framing beyond a handful of terminal markers. It is built
//! in layers:
//!
//! - [`protocol`] -- marker constants, command encoding, bounded response buffer
//! - [`commands`] -- AT command builders and response parsers (pure)
//! - [`io`] -- [`AtSession`]: command round trips and deadline-bounded polling
//! - [`modem`] -- [`GsmModem`]: the status and send sequences, behind one lock
//! - [`builder`] -- [`GsmModemBuilder`]
//!
//! # Example
//!
//! ```no_run
//! use smsgate_at::GsmModemBuilder;
//! use smsgate_core::Modem;
//!
//! # async fn example() -> smsgate_core::Result<()> {
//! let modem = GsmModemBuilder::new().serial_port("/dev/ttyUSB0").build()?;
//! let status = modem.status().await?;
//! println!("signal: {} ({})", status.signal_strength, status.signal_strength_desc);
//!
//! let result = modem.send_sms("+420123456789", "hello").await?;
//! println!("reference: {:?}", result.message_reference);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod commands;
pub mod io;
pub mod modem;
pub mod protocol;

pub use builder::GsmModemBuilder;
pub use io::{AtSession, AtTiming};
pub use modem::GsmModem;
