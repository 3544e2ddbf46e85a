//! The `Modem` trait -- the capability contract every backend provides.
//!
//! The job queue and the HTTP layer program against `dyn Modem` and never
//! learn whether a physical modem or the simulator is behind it. Exactly
//! two implementations exist: `GsmModem` in `smsgate-at` drives real
//! hardware over AT commands, and [`SimulatorModem`](crate::SimulatorModem)
//! stands in for development and tests.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{SendResult, Status};

/// Asynchronous interface to a device that can report health and send SMS.
///
/// Implementations must serialize their own access to the underlying
/// resource: two concurrent calls may arrive (an out-of-band status query
/// while the queue worker is sending), and they must not interleave on the
/// wire.
#[async_trait]
pub trait Modem: Send + Sync {
    /// Query connectivity, registration, signal, and identity.
    async fn status(&self) -> Result<Status>;

    /// Send one text message to `phone`.
    ///
    /// Returns a [`SendResult`] when the message was submitted (including the
    /// uncertain case). Fatal conditions are reported as `Err`.
    async fn send_sms(&self, phone: &str, message: &str) -> Result<SendResult>;
}

/// Reject empty phone numbers or messages before any I/O happens.
pub fn validate_sms(phone: &str, message: &str) -> Result<()> {
    if phone.is_empty() {
        return Err(Error::InvalidParameter("phone number is required".into()));
    }
    if message.is_empty() {
        return Err(Error::InvalidParameter("message is required".into()));
    }
    Ok(())
}
