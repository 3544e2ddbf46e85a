//! smsgate-core: Core traits, types, and error definitions for smsgate.
//!
//! This crate defines the backend-agnostic abstractions shared by the AT
//! protocol engine, the job queue, and the HTTP gateway. Consumers depend on
//! these types without pulling in serial-port support.
//!
//! # Key types
//!
//! - [`Modem`] -- the capability contract (status query, message send)
//! - [`SimulatorModem`] -- the hardware-free `Modem`
//! - [`Transport`] / [`Connector`] -- byte-level channel and its opener
//! - [`Status`] / [`SendResult`] -- the values crossing the contract
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod modem;
pub mod simulator;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use modem::{Modem, validate_sms};
pub use simulator::SimulatorModem;
pub use transport::{Connector, Transport};
pub use types::*;
