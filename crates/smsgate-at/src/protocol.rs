//! Framing constants and marker detection for the AT command protocol.
//!
//! AT responses have no length prefix or frame delimiter a parser could
//! rely on. A response is considered complete once the accumulated text
//! contains one of a small set of terminal markers (`OK`, `ERROR`, the `>`
//! send prompt, or `+CMGS:`). Which markers apply depends on the step.

/// Carriage return terminating every AT command line.
pub const CR: u8 = b'\r';

/// Ctrl-Z, ending the message body in text-mode `AT+CMGS`.
pub const CTRL_Z: u8 = 0x1A;

/// Escape, which aborts a pending `AT+CMGS` body.
pub const ESC: u8 = 0x1B;

/// Final result code for a successful command.
pub const OK: &str = "OK";

/// Final result code for a failed command.
pub const ERROR: &str = "ERROR";

/// Prompt the modem prints when it is ready for the message body.
pub const PROMPT: &str = ">";

/// Intermediate result announcing the message reference of a sent SMS.
pub const CMGS: &str = "+CMGS:";

/// Markers ending an ordinary command exchange.
pub const COMMAND_MARKERS: &[&str] = &[OK, ERROR];

/// Markers ending the wait for the message-body prompt.
pub const PROMPT_MARKERS: &[&str] = &[PROMPT, ERROR];

/// Markers ending the wait after the message body was submitted.
pub const SUBMIT_MARKERS: &[&str] = &[CMGS, OK, ERROR];

/// Upper bound on accumulated response text. AT responses are a few dozen
/// bytes; anything beyond this is line noise.
pub const MAX_RESPONSE: usize = 8192;

/// Encode an AT command line: the command text followed by a carriage return.
///
/// ```
/// use smsgate_at::protocol::encode_command;
///
/// assert_eq!(encode_command("AT+CSQ"), b"AT+CSQ\r");
/// ```
pub fn encode_command(cmd: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(cmd.len() + 1);
    bytes.extend_from_slice(cmd.as_bytes());
    bytes.push(CR);
    bytes
}

/// Encode a text-mode message body: the raw text followed by Ctrl-Z.
pub fn encode_message_body(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(CTRL_Z);
    bytes
}

/// Return the first marker (in `markers` order) contained in `text`.
pub fn find_marker<'m>(text: &str, markers: &[&'m str]) -> Option<&'m str> {
    markers.iter().copied().find(|marker| text.contains(marker))
}

/// Whether the response contains the `OK` final result code.
pub fn is_ok(response: &str) -> bool {
    response.contains(OK)
}

/// Whether the response contains the `ERROR` final result code.
///
/// Also matches the extended `+CME ERROR` and `+CMS ERROR` forms.
pub fn is_error(response: &str) -> bool {
    response.contains(ERROR)
}

/// Accumulates bytes read from the modem, bounded to [`MAX_RESPONSE`].
///
/// When the bound is exceeded the oldest bytes are discarded so that a
/// marker arriving at the end of a noisy burst is still detected.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
        if self.bytes.len() > MAX_RESPONSE {
            let excess = self.bytes.len() - MAX_RESPONSE;
            tracing::warn!(
                len = self.bytes.len(),
                "response buffer overflow, discarding oldest bytes"
            );
            self.bytes.drain(..excess);
        }
    }

    /// The accumulated text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
