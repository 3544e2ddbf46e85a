//! Core data types shared by every modem backend.
//!
//! [`Status`] and [`SendResult`] are the two values that cross the
//! capability boundary. Both serialize to the JSON shapes exposed by the
//! HTTP API, with optional fields omitted when absent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw RSSI value reported by `AT+CSQ` when the modem cannot measure signal.
pub const RSSI_UNKNOWN: u8 = 99;

/// Highest meaningful RSSI value reported by `AT+CSQ`.
pub const RSSI_MAX: u8 = 31;

/// Warning attached to a send whose outcome could not be confirmed.
///
/// The message body and terminator were already written when the deadline
/// ran out, so the send is reported as successful with this warning rather
/// than as a failure that might prompt a duplicate transmission.
pub const UNCERTAIN_DELIVERY: &str = "uncertain result — check phone for delivery";

/// Coarse signal quality bucket derived from the raw RSSI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    /// RSSI below 10.
    Weak,
    /// RSSI 10 to 19.
    Fair,
    /// RSSI 20 to 29.
    Good,
    /// RSSI 30 and above.
    Excellent,
    /// The modem reported 99 or the value could not be read.
    Unknown,
}

impl SignalQuality {
    /// Bucket a raw `AT+CSQ` RSSI value.
    ///
    /// ```
    /// use smsgate_core::SignalQuality;
    ///
    /// assert_eq!(SignalQuality::from_rssi(5), SignalQuality::Weak);
    /// assert_eq!(SignalQuality::from_rssi(31), SignalQuality::Excellent);
    /// assert_eq!(SignalQuality::from_rssi(99), SignalQuality::Unknown);
    /// ```
    pub fn from_rssi(rssi: u8) -> Self {
        match rssi {
            RSSI_UNKNOWN => SignalQuality::Unknown,
            0..10 => SignalQuality::Weak,
            10..20 => SignalQuality::Fair,
            20..30 => SignalQuality::Good,
            _ => SignalQuality::Excellent,
        }
    }

    /// The lowercase label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalQuality::Weak => "weak",
            SignalQuality::Fair => "fair",
            SignalQuality::Good => "good",
            SignalQuality::Excellent => "excellent",
            SignalQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of modem health, produced fresh for every status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The modem answered `AT` with `OK`.
    pub connected: bool,
    /// Registered on a home (1) or roaming (5) network.
    pub network_registered: bool,
    /// Raw RSSI, 0-31 or 99 for unknown.
    pub signal_strength: u8,
    /// Bucketed description of `signal_strength`.
    pub signal_strength_desc: SignalQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Status {
    /// A status for a modem that answered `AT` but nothing else yet.
    pub fn connected() -> Self {
        Status {
            connected: true,
            network_registered: false,
            signal_strength: RSSI_UNKNOWN,
            signal_strength_desc: SignalQuality::Unknown,
            manufacturer: None,
            model: None,
        }
    }

    /// Record a signal reading, keeping the description in sync.
    pub fn set_signal(&mut self, rssi: u8) {
        self.signal_strength = rssi;
        self.signal_strength_desc = SignalQuality::from_rssi(rssi);
    }
}

/// Outcome of one send attempt. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    /// Message reference echoed by the modem in `+CMGS: <mr>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    /// A confirmed send, with the modem's message reference if it gave one.
    pub fn delivered(message_reference: Option<String>) -> Self {
        SendResult {
            success: true,
            message_reference,
            error: None,
        }
    }

    /// A send that ran out of time after the body was transmitted.
    pub fn uncertain() -> Self {
        SendResult {
            success: true,
            message_reference: None,
            error: Some(UNCERTAIN_DELIVERY.to_string()),
        }
    }

    /// A failed send carrying a description of what went wrong.
    pub fn failed(error: impl Into<String>) -> Self {
        SendResult {
            success: false,
            message_reference: None,
            error: Some(error.into()),
        }
    }

    /// Whether this result carries the uncertain-delivery warning.
    pub fn is_uncertain(&self) -> bool {
        self.success && self.error.as_deref() == Some(UNCERTAIN_DELIVERY)
    }
}
