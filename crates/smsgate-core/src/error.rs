//! Error types for the SMS gateway.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, modem protocol
//! failures, and argument validation failures are all captured here.

/// The error type for all gateway operations.
///
/// Variants map onto the failure classes seen when driving a modem over a
/// serial line: the port could not be opened or written, the modem answered
/// a mandatory command with `ERROR`, or the caller passed bad arguments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open, configure, or write).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (mandatory AT step failed, not registered).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for data from the modem.
    ///
    /// Transports return this when a read produced no bytes within the
    /// channel's intrinsic read timeout. The protocol engine treats it as
    /// "nothing yet" and keeps polling until its own deadline.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed (empty phone number or message).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transport has been closed or was never opened.
    #[error("not connected")]
    NotConnected,

    /// The connection to the modem was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
