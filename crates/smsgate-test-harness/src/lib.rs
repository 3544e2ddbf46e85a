//! smsgate-test-harness: Mock transports for smsgate.
//!
//! This crate provides [`MockTransport`] and [`MockConnector`] for
//! deterministic unit testing of the AT protocol engine without a modem.

pub mod mock_serial;

pub use mock_serial::{MOCK_READ_TIMEOUT, MockConnector, MockTransport, SentLog};
