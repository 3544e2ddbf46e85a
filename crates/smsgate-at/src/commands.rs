//! AT command builders and response parsers.
//!
//! All functions are pure -- they produce command text or consume response
//! text without performing any I/O. The caller sends the commands through an
//! [`AtSession`](crate::io::AtSession) and feeds the accumulated responses
//! back into the parsers.
//!
//! # Command reference
//!
//! Commands follow 3GPP TS 27.005 / 27.007 as implemented by common GSM
//! modules (SIMCom, Quectel, Huawei). Responses usually echo the command
//! line before the result, e.g. `AT+CSQ\r\r\n+CSQ: 18,0\r\n\r\nOK\r\n`.

use std::sync::LazyLock;

use regex::Regex;

use smsgate_core::{Error, Result, SendResult};

use crate::protocol;

/// `+CREG` registration status: registered, home network.
pub const REG_HOME: u8 = 1;
/// `+CREG` registration status: registered, roaming.
pub const REG_ROAMING: u8 = 5;

static CREG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+CREG: \d,(\d)").expect("valid +CREG pattern"));
static CSQ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+CSQ: (\d+),").expect("valid +CSQ pattern"));
static CMGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+CMGS: (\d+)").expect("valid +CMGS pattern"));

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// Attention command (`AT`), used as a liveness check.
pub fn cmd_attention() -> &'static str {
    "AT"
}

/// Request manufacturer identification (`AT+CGMI`).
pub fn cmd_manufacturer() -> &'static str {
    "AT+CGMI"
}

/// Request model identification (`AT+CGMM`).
pub fn cmd_model() -> &'static str {
    "AT+CGMM"
}

/// Query network registration (`AT+CREG?`).
pub fn cmd_registration() -> &'static str {
    "AT+CREG?"
}

/// Query signal quality (`AT+CSQ`).
pub fn cmd_signal_quality() -> &'static str {
    "AT+CSQ"
}

/// Select SMS text mode (`AT+CMGF=1`).
pub fn cmd_text_mode() -> &'static str {
    "AT+CMGF=1"
}

/// Select the GSM 7-bit default alphabet (`AT+CSCS="GSM"`).
pub fn cmd_gsm_charset() -> &'static str {
    "AT+CSCS=\"GSM\""
}

/// Set text-mode parameters (`AT+CSMP=17,167,0,0`).
///
/// First octet 17 (SMS-SUBMIT with relative validity period), validity 167
/// (24 hours), protocol identifier 0, data coding scheme 0 (GSM 7-bit).
pub fn cmd_sms_parameters() -> &'static str {
    "AT+CSMP=17,167,0,0"
}

/// Start a text-mode send to `phone` (`AT+CMGS="<phone>"`).
pub fn cmd_send_sms(phone: &str) -> String {
    format!("AT+CMGS=\"{phone}\"")
}

// ---------------------------------------------------------------
// Argument checks
// ---------------------------------------------------------------

/// Reject phone numbers that would break out of the quoted `AT+CMGS`
/// argument or the command line.
pub fn check_phone(phone: &str) -> Result<()> {
    if phone.chars().any(|c| c == '"' || c.is_control()) {
        return Err(Error::InvalidParameter(
            "phone number contains invalid characters".into(),
        ));
    }
    Ok(())
}

/// Reject message bodies containing the Ctrl-Z terminator or Escape, either
/// of which would end the body early.
pub fn check_message(message: &str) -> Result<()> {
    if message
        .bytes()
        .any(|b| b == protocol::CTRL_Z || b == protocol::ESC)
    {
        return Err(Error::InvalidParameter(
            "message contains control characters".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------
// Response parsers
// ---------------------------------------------------------------

/// Extract the information line from a simple query response.
///
/// Returns the first line that is non-empty, is not the echoed command, and
/// is not the literal `OK`.
///
/// ```
/// use smsgate_at::commands::parse_info_line;
///
/// let resp = "AT+CGMI\r\r\nSIMCOM_Ltd\r\n\r\nOK\r\n";
/// assert_eq!(parse_info_line(resp).as_deref(), Some("SIMCOM_Ltd"));
/// ```
pub fn parse_info_line(response: &str) -> Option<String> {
    response
        .split('\n')
        .map(str::trim)
        .find(|line| !line.is_empty() && *line != protocol::OK && !line.starts_with("AT"))
        .map(str::to_string)
}

/// Extract the `<stat>` digit from a `+CREG: <n>,<stat>` response.
pub fn parse_registration(response: &str) -> Option<u8> {
    CREG_RE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a `+CREG` status means the modem can send (home or roaming).
pub fn is_registered(stat: u8) -> bool {
    stat == REG_HOME || stat == REG_ROAMING
}

/// Extract the RSSI from a `+CSQ: <rssi>,<ber>` response.
pub fn parse_signal_quality(response: &str) -> Option<u8> {
    CSQ_RE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract the message reference from a `+CMGS: <mr>` response.
pub fn parse_message_reference(response: &str) -> Option<String> {
    CMGS_RE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify the final response after the message body was submitted.
///
/// In priority order:
/// 1. `+CMGS: <mr>` -- sent, with reference.
/// 2. `OK` -- sent, no reference.
/// 3. `ERROR` -- failed.
/// 4. Anything else, including a `+CMGS:` whose reference never arrived
///    -- reported as sent with the uncertain-delivery warning.
pub fn parse_submit_response(response: &str) -> Result<SendResult> {
    if let Some(reference) = parse_message_reference(response) {
        return Ok(SendResult::delivered(Some(reference)));
    }
    if protocol::is_ok(response) {
        return Ok(SendResult::delivered(None));
    }
    if protocol::is_error(response) {
        return Err(Error::Protocol(format!(
            "modem returned an error: {}",
            response.trim()
        )));
    }
    Ok(SendResult::uncertain())
}
