//! Transport and connector traits for modem communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a modem. The
//! serial implementation lives in `smsgate-transport`; a scripted mock for
//! tests lives in `smsgate-test-harness`.
//!
//! A [`Connector`] opens a fresh, fully configured transport. The AT engine
//! opens one transport per operation and closes it when the operation ends,
//! so a modem that was unplugged and replugged between requests is picked
//! up again without restarting the gateway.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to a modem.
///
/// The link is half-duplex and line-oriented in practice, but the trait only
/// moves bytes. Reads are bounded by a timeout intrinsic to the channel,
/// fixed when the transport was opened.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the modem.
    ///
    /// Returns once all bytes have been handed to the underlying channel.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the modem into the provided buffer.
    ///
    /// Returns the number of bytes read. If nothing arrives within the
    /// channel's intrinsic read timeout, returns
    /// [`Error::Timeout`](crate::error::Error::Timeout).
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently open.
    fn is_connected(&self) -> bool;
}

/// Opens configured transports on demand.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open and configure a new transport.
    ///
    /// Failure here is fatal for the calling operation and is reported as
    /// [`Error::Transport`](crate::error::Error::Transport).
    async fn connect(&self) -> Result<Box<dyn Transport>>;

    /// A human-readable name for the endpoint (e.g. `/dev/ttyUSB0`).
    fn endpoint(&self) -> &str;
}
