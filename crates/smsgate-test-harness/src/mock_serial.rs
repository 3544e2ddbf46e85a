//! Mock transport for deterministic testing of the AT engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. [`MockConnector`] hands out scripted transports
//! one per `connect()` call, mirroring how the engine opens a fresh serial
//! port for every operation.
//!
//! Reads with nothing pending sleep for the mock's read timeout before
//! returning [`Error::Timeout`], like a real port with an intrinsic read
//! timeout. Run timing-sensitive tests with
//! `#[tokio::test(start_paused = true)]` so those sleeps cost no wall time.
//!
//! # Example
//!
//! ```
//! use smsgate_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends `AT\r`, the modem echoes it and answers OK.
//! mock.expect(b"AT\r", b"AT\r\r\nOK\r\n");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use smsgate_core::error::{Error, Result};
use smsgate_core::transport::{Connector, Transport};

/// Read timeout used by mocks unless overridden.
pub const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Shared record of every `send()` payload, in order.
pub type SentLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// Chunks returned by successive `receive()` calls after the request.
    response: VecDeque<Vec<u8>>,
}

/// A mock [`Transport`] for testing the AT engine without a modem.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation; that
/// expectation's response chunks are then returned one per `receive()`.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Response chunks pending for upcoming `receive()` calls.
    pending: VecDeque<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// How long an empty read blocks before timing out.
    read_timeout: Duration,
    /// Log of all bytes sent through this transport.
    sent_log: SentLog,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            connected: true,
            read_timeout: MOCK_READ_TIMEOUT,
            sent_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an expected request with a response delivered in a single read.
    ///
    /// An empty `response` models a modem that never answers.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        if response.is_empty() {
            self.expect_chunks(request, &[]);
        } else {
            self.expect_chunks(request, &[response]);
        }
    }

    /// Add an expected request whose response trickles in over several reads.
    pub fn expect_chunks(&mut self, request: &[u8], chunks: &[&[u8]]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Override how long an empty read waits before reporting a timeout.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Return a copy of all data that has been sent through this transport.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A handle to the sent log that stays valid after the mock is moved.
    pub fn sent_log(&self) -> SentLog {
        Arc::clone(&self.sent_log)
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data)
                )));
            }
            self.pending = expectation.response;
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let Some(mut chunk) = self.pending.pop_front() else {
            tokio::time::sleep(self.read_timeout).await;
            return Err(Error::Timeout);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Leave the unread tail for the next call.
            chunk.drain(..n);
            self.pending.push_front(chunk);
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// A mock [`Connector`] that hands out pre-scripted transports.
///
/// Each `connect()` pops the next queued [`MockTransport`]. Clones share the
/// same state, so a test can keep one clone for inspection after moving
/// another into the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<ConnectorState>>,
}

#[derive(Debug, Default)]
struct ConnectorState {
    transports: VecDeque<MockTransport>,
    open_error: Option<String>,
    connects: usize,
    logs: Vec<SentLog>,
}

impl MockConnector {
    /// Create a connector with no transports queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector that will hand out `transport` on the first open.
    pub fn with(transport: MockTransport) -> Self {
        let connector = Self::new();
        connector.push(transport);
        connector
    }

    /// Create a connector whose every open fails with `message`.
    pub fn failing(message: &str) -> Self {
        let connector = Self::new();
        connector.state().open_error = Some(message.to_string());
        connector
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ConnectorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a transport for a future `connect()`.
    pub fn push(&self, transport: MockTransport) {
        self.state().transports.push_back(transport);
    }

    /// Number of `connect()` calls so far, successful or not.
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    /// Every payload sent through transports handed out by this connector.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state()
            .logs
            .iter()
            .flat_map(|log| log.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let mut state = self.state();
        state.connects += 1;

        if let Some(message) = &state.open_error {
            return Err(Error::Transport(message.clone()));
        }

        let transport = state
            .transports
            .pop_front()
            .ok_or_else(|| Error::Transport("no mock transport available".into()))?;
        state.logs.push(transport.sent_log());
        Ok(Box::new(transport))
    }

    fn endpoint(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"AT\r\r\nOK\r\n");

        mock.send(b"AT\r").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"AT\r\r\nOK\r\n");
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"OK");
        mock.expect(b"AT+CSQ\r", b"OK");

        mock.send(b"AT\r").await.unwrap();
        mock.send(b"AT+CSQ\r").await.unwrap();

        let sent = mock.sent_data();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], b"AT\r");
        assert_eq!(sent[1], b"AT+CSQ\r");
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"OK");

        let result = mock.send(b"ATZ\r").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(b"AT\r").await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_transport_empty_read_waits_for_timeout() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];

        let start = tokio::time::Instant::now();
        let result = mock.receive(&mut buf).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
        assert_eq!(start.elapsed(), MOCK_READ_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_transport_chunked_response() {
        let mut mock = MockTransport::new();
        mock.expect_chunks(b"AT+CSQ\r", &[b"\r\n+CSQ: 1", b"8,0\r\n", b"OK\r\n"]);
        mock.send(b"AT+CSQ\r").await.unwrap();

        let mut buf = [0u8; 64];
        let mut collected = Vec::new();
        for _ in 0..3 {
            let n = mock.receive(&mut buf).await.unwrap();
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"\r\n+CSQ: 18,0\r\nOK\r\n");
        assert!(matches!(mock.receive(&mut buf).await, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"ABCD");
        mock.send(b"AT\r").await.unwrap();

        let mut buf = [0u8; 2];
        let n = mock.receive(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"AB");
        let n = mock.receive(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"CD");
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert!(matches!(
            mock.send(b"AT\r").await.unwrap_err(),
            Error::NotConnected
        ));
    }

    #[tokio::test]
    async fn mock_transport_remaining_expectations() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r", b"OK");
        mock.expect(b"AT\r", b"OK");
        assert_eq!(mock.remaining_expectations(), 2);

        mock.send(b"AT\r").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 1);
    }

    #[tokio::test]
    async fn connector_hands_out_transports_in_order() {
        let mut first = MockTransport::new();
        first.expect(b"AT\r", b"OK");
        let connector = MockConnector::with(first);
        connector.push(MockTransport::new());

        let mut t1 = connector.connect().await.unwrap();
        t1.send(b"AT\r").await.unwrap();
        let _t2 = connector.connect().await.unwrap();
        assert!(connector.connect().await.is_err());

        assert_eq!(connector.connect_count(), 3);
        assert_eq!(connector.sent_data(), vec![b"AT\r".to_vec()]);
    }

    #[tokio::test]
    async fn failing_connector_reports_transport_error() {
        let connector = MockConnector::failing("port busy");
        match connector.connect().await {
            Err(Error::Transport(msg)) => assert_eq!(msg, "port busy"),
            _ => panic!("expected transport error"),
        }
        assert_eq!(connector.connect_count(), 1);
    }
}
