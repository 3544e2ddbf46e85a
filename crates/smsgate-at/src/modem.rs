//! GsmModem -- the [`Modem`] trait implementation for AT-command modems.
//!
//! This module ties the AT command set ([`commands`]) and the exchange
//! primitives ([`AtSession`]) to a [`Connector`] to produce the hardware
//! backend. Every operation opens its own transport, runs a fixed sequence
//! of commands, and closes the transport again, all while holding a single
//! lock so two sequences never interleave on the wire.
//!
//! Each step of a sequence is graded:
//! - **fatal**: failure aborts the operation with an error;
//! - **best-effort**: failure is logged and ignored;
//! - **conditional**: only an explicit negative answer aborts.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use smsgate_core::error::{Error, Result};
use smsgate_core::modem::{Modem, validate_sms};
use smsgate_core::transport::{Connector, Transport};
use smsgate_core::types::{SendResult, Status};

use crate::commands;
use crate::io::{AtSession, AtTiming};
use crate::protocol;

/// A GSM modem driven over AT commands.
///
/// Constructed via [`GsmModemBuilder`](crate::builder::GsmModemBuilder).
pub struct GsmModem {
    /// The lock owns the connector: no transport can be opened without it.
    connector: Mutex<Box<dyn Connector>>,
    endpoint: String,
    timing: AtTiming,
}

impl GsmModem {
    pub(crate) fn new(connector: Box<dyn Connector>, timing: AtTiming) -> Self {
        let endpoint = connector.endpoint().to_string();
        GsmModem {
            connector: Mutex::new(connector),
            endpoint,
            timing,
        }
    }

    /// The device this modem talks to (e.g. `/dev/ttyUSB0`).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timing(&self) -> &AtTiming {
        &self.timing
    }
}

impl std::fmt::Debug for GsmModem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsmModem")
            .field("endpoint", &self.endpoint)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Modem for GsmModem {
    async fn status(&self) -> Result<Status> {
        let connector = self.connector.lock().await;
        let mut transport = connector.connect().await?;
        debug!(port = %self.endpoint, "querying modem status");

        let result = {
            let mut session = AtSession::new(transport.as_mut(), &self.timing);
            query_status(&mut session).await
        };
        close_quietly(transport.as_mut(), &self.endpoint).await;
        result
    }

    async fn send_sms(&self, phone: &str, message: &str) -> Result<SendResult> {
        validate_sms(phone, message)?;
        commands::check_phone(phone)?;
        commands::check_message(message)?;

        let connector = self.connector.lock().await;
        let mut transport = connector.connect().await?;
        info!(port = %self.endpoint, phone, len = message.len(), "sending SMS");

        let result = {
            let mut session = AtSession::new(transport.as_mut(), &self.timing);
            submit(&mut session, phone, message).await
        };
        close_quietly(transport.as_mut(), &self.endpoint).await;

        match &result {
            Ok(sent) if sent.is_uncertain() => {
                warn!(phone, "modem did not confirm the send, delivery uncertain")
            }
            Ok(sent) => info!(phone, reference = ?sent.message_reference, "SMS accepted"),
            Err(e) => warn!(phone, error = %e, "SMS send failed"),
        }
        result
    }
}

// ---------------------------------------------------------------
// Command sequences
// ---------------------------------------------------------------

/// Connectivity check, identity, registration, and signal.
///
/// Only the initial `AT` is fatal.
async fn query_status(session: &mut AtSession<'_>) -> Result<Status> {
    let resp = session.send_command(commands::cmd_attention()).await?;
    if !protocol::is_ok(&resp) {
        return Err(Error::Protocol("modem not responding".into()));
    }
    let mut status = Status::connected();

    status.manufacturer = best_effort(session, commands::cmd_manufacturer())
        .await
        .filter(|r| protocol::is_ok(r))
        .and_then(|r| commands::parse_info_line(&r));
    status.model = best_effort(session, commands::cmd_model())
        .await
        .filter(|r| protocol::is_ok(r))
        .and_then(|r| commands::parse_info_line(&r));

    if let Some(stat) = best_effort(session, commands::cmd_registration())
        .await
        .and_then(|r| commands::parse_registration(&r))
    {
        status.network_registered = commands::is_registered(stat);
    }

    if let Some(rssi) = best_effort(session, commands::cmd_signal_quality())
        .await
        .and_then(|r| commands::parse_signal_quality(&r))
    {
        status.set_signal(rssi);
    }

    Ok(status)
}

/// The seven-step text-mode send.
async fn submit(session: &mut AtSession<'_>, phone: &str, message: &str) -> Result<SendResult> {
    // 1. Liveness (fatal).
    let resp = session.send_command(commands::cmd_attention()).await?;
    if !protocol::is_ok(&resp) {
        return Err(Error::Protocol("modem not responding".into()));
    }

    // 2. Text mode (fatal).
    let resp = session.send_command(commands::cmd_text_mode()).await?;
    if !protocol::is_ok(&resp) {
        return Err(Error::Protocol("failed to set SMS text mode".into()));
    }

    // 3-4. Character set and message parameters (best-effort).
    best_effort(session, commands::cmd_gsm_charset()).await;
    best_effort(session, commands::cmd_sms_parameters()).await;

    // 5. Registration (conditional): an unparseable answer is not a refusal.
    match best_effort(session, commands::cmd_registration())
        .await
        .and_then(|r| commands::parse_registration(&r))
    {
        Some(stat) if !commands::is_registered(stat) => {
            return Err(Error::Protocol(format!(
                "not registered on network (status: {stat})"
            )));
        }
        Some(_) => {}
        None => debug!("registration status unknown, attempting send anyway"),
    }

    // 6. Initiate the send and wait for the body prompt.
    let deadline = session.timing().prompt_deadline;
    session
        .write(&protocol::encode_command(&commands::cmd_send_sms(phone)))
        .await?;
    let prompt = session.poll_until(protocol::PROMPT_MARKERS, deadline).await?;
    if protocol::is_error(&prompt) {
        debug!(response = %prompt.escape_debug(), "AT+CMGS rejected");
        return Err(Error::Protocol("modem rejected the send command".into()));
    }
    if !prompt.contains(protocol::PROMPT) {
        warn!("no send prompt received, writing message body anyway");
    }

    // 7. Body plus Ctrl-Z, then wait for the network.
    let deadline = session.timing().submit_deadline;
    session
        .write(&protocol::encode_message_body(message))
        .await?;
    let response = session
        .poll_until(protocol::SUBMIT_MARKERS, deadline)
        .await?;
    commands::parse_submit_response(&response)
}

/// Run a command whose failure must not abort the sequence.
async fn best_effort(session: &mut AtSession<'_>, cmd: &str) -> Option<String> {
    match session.send_command(cmd).await {
        Ok(resp) => Some(resp),
        Err(e) => {
            debug!(cmd, error = %e, "best-effort command failed");
            None
        }
    }
}

async fn close_quietly(transport: &mut dyn Transport, endpoint: &str) {
    if let Err(e) = transport.close().await {
        debug!(port = %endpoint, error = %e, "error closing transport");
    }
}
