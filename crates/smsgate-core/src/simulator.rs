//! A hardware-free [`Modem`] for development and tests.
//!
//! [`SimulatorModem`] always reports a healthy, registered modem and accepts
//! every well-formed send after a short randomized delay, handing out
//! increasing message references like a real modem would.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use crate::error::Result;
use crate::modem::{Modem, validate_sms};
use crate::types::{RSSI_MAX, SendResult, SignalQuality, Status};

/// Default simulated send latency in milliseconds.
pub const DEFAULT_LATENCY_MS: RangeInclusive<u64> = 500..=1000;

/// A virtual modem that logs messages instead of transmitting them.
#[derive(Debug)]
pub struct SimulatorModem {
    latency_ms: RangeInclusive<u64>,
    last_reference: AtomicU32,
}

impl SimulatorModem {
    /// Create a simulator with the default 500-1000 ms send latency.
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY_MS)
    }

    /// Create a simulator whose sends take a uniformly random time drawn
    /// from `latency_ms`. Pass `0..=0` for instant sends.
    pub fn with_latency(latency_ms: RangeInclusive<u64>) -> Self {
        SimulatorModem {
            latency_ms,
            last_reference: AtomicU32::new(0),
        }
    }

    fn sample_latency(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.latency_ms.clone());
        Duration::from_millis(ms)
    }
}

impl Default for SimulatorModem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Modem for SimulatorModem {
    async fn status(&self) -> Result<Status> {
        Ok(Status {
            connected: true,
            network_registered: true,
            signal_strength: RSSI_MAX,
            signal_strength_desc: SignalQuality::Excellent,
            manufacturer: Some("Simulator".into()),
            model: Some("Virtual Modem".into()),
        })
    }

    async fn send_sms(&self, phone: &str, message: &str) -> Result<SendResult> {
        validate_sms(phone, message)?;

        let delay = self.sample_latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reference = self.last_reference.fetch_add(1, Ordering::SeqCst) + 1;
        info!(phone = %phone, reference, "[simulator] SMS sent");
        info!(message = %message, "[simulator] message body");

        Ok(SendResult::delivered(Some(reference.to_string())))
    }
}
