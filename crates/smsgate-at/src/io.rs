//! Command/response exchange over a single open transport.
//!
//! An [`AtSession`] borrows a transport for the duration of one modem
//! operation. It provides the two primitives every AT sequence is built
//! from: [`send_command`](AtSession::send_command) for an ordinary
//! round trip and [`poll_until`](AtSession::poll_until) for waiting on an
//! arbitrary set of terminal markers.
//!
//! Polling is a bounded loop: each read waits at most the transport's
//! intrinsic read timeout, and the loop stops at the first marker or when
//! the wall-clock deadline passes. A missed deadline is not an error; the
//! caller receives whatever text arrived and interprets it.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use smsgate_core::error::{Error, Result};
use smsgate_core::transport::Transport;

use crate::protocol::{self, ResponseBuffer};

/// Timing parameters for AT exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtTiming {
    /// Intrinsic read timeout configured on the serial port.
    pub read_timeout: Duration,
    /// Pause after writing a command before polling for its response.
    pub command_grace: Duration,
    /// Deadline for an ordinary command response.
    pub command_deadline: Duration,
    /// Deadline for the `>` prompt after `AT+CMGS`.
    pub prompt_deadline: Duration,
    /// Deadline for the network to accept a submitted message.
    pub submit_deadline: Duration,
}

impl Default for AtTiming {
    fn default() -> Self {
        AtTiming {
            read_timeout: Duration::from_millis(200),
            command_grace: Duration::from_millis(100),
            command_deadline: Duration::from_secs(3),
            prompt_deadline: Duration::from_secs(3),
            submit_deadline: Duration::from_secs(30),
        }
    }
}

/// One modem operation's exclusive view of the transport.
pub struct AtSession<'a> {
    transport: &'a mut dyn Transport,
    timing: &'a AtTiming,
}

impl<'a> AtSession<'a> {
    pub fn new(transport: &'a mut dyn Transport, timing: &'a AtTiming) -> Self {
        AtSession { transport, timing }
    }

    pub fn timing(&self) -> &AtTiming {
        self.timing
    }

    /// Write `cmd` plus carriage return, wait the grace period, then poll for
    /// `OK` or `ERROR` until the command deadline.
    ///
    /// Returns the accumulated response text, which may be partial or empty
    /// if the deadline ran out. Only transport failures are errors.
    pub async fn send_command(&mut self, cmd: &str) -> Result<String> {
        trace!(cmd, "sending AT command");
        self.write(&protocol::encode_command(cmd)).await?;
        tokio::time::sleep(self.timing.command_grace).await;
        let response = self
            .poll_until(protocol::COMMAND_MARKERS, self.timing.command_deadline)
            .await?;
        trace!(cmd, response = %response.escape_debug(), "AT command response");
        Ok(response)
    }

    /// Write raw bytes without waiting for a response.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.transport.send(data).await
    }

    /// Read until the accumulated text contains any of `markers` or
    /// `deadline` has elapsed.
    pub async fn poll_until(&mut self, markers: &[&str], deadline: Duration) -> Result<String> {
        let cutoff = Instant::now() + deadline;
        let mut response = ResponseBuffer::new();
        let mut buf = [0u8; 512];

        while Instant::now() < cutoff {
            match self.transport.receive(&mut buf).await {
                Ok(0) => return Err(Error::ConnectionLost),
                Ok(n) => {
                    response.extend(&buf[..n]);
                    let text = response.text();
                    if let Some(marker) = protocol::find_marker(&text, markers) {
                        trace!(marker, "terminal marker received");
                        return Ok(text);
                    }
                }
                Err(Error::Timeout) => {}
                Err(e) => return Err(e),
            }
        }

        debug!(
            ?markers,
            bytes = response.len(),
            deadline_ms = deadline.as_millis(),
            "deadline reached without terminal marker"
        );
        Ok(response.text())
    }
}
