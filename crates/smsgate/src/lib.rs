//! # smsgate -- Queue-backed SMS delivery through a GSM modem
//!
//! `smsgate` sends text messages through a cellular modem attached over a
//! serial line, tracking every request as an asynchronous job. It is
//! designed for small appliances and back-office services that need to push
//! alerts or one-time codes without a third-party SMS provider.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use smsgate::{Backend, JobQueue, QueueConfig};
//!
//! # async fn example() -> smsgate::Result<()> {
//! let modem = smsgate::open(&Backend::Serial {
//!     port: "/dev/ttyUSB0".into(),
//!     baud_rate: 115_200,
//! })?;
//!
//! let status = modem.status().await?;
//! println!("registered: {}", status.network_registered);
//!
//! let queue = JobQueue::new(Arc::clone(&modem), QueueConfig::default());
//! if let Some(job) = queue.enqueue("+420123456789", "hello") {
//!     println!("queued {}", job.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                        |
//! |------------------------|------------------------------------------------|
//! | `smsgate-core`         | [`Modem`] trait, data types, errors, simulator |
//! | `smsgate-transport`    | Serial transport and connector                 |
//! | `smsgate-at`           | AT command protocol engine ([`GsmModem`](at::GsmModem)) |
//! | `smsgate-queue`        | [`JobQueue`]: admission control and worker     |
//! | **`smsgate`**          | This facade crate -- re-exports everything     |
//!
//! Both backends implement [`Modem`], so the queue and any API layer work
//! with `dyn Modem` and never learn which one is behind it.
//!
//! ## Feature Flags
//!
//! | Feature    | Enables                                   | Default |
//! |------------|-------------------------------------------|---------|
//! | `hardware` | [`at`] and [`transport`] modules (serial) | yes     |

use std::sync::Arc;

pub use smsgate_core::*;
pub use smsgate_queue::{Job, JobQueue, JobStatus, QueueConfig};

/// AT-command protocol engine for physical modems.
#[cfg(feature = "hardware")]
pub mod at {
    pub use smsgate_at::*;
}

/// Serial transport.
#[cfg(feature = "hardware")]
pub mod transport {
    pub use smsgate_transport::*;
}

/// Which modem implementation to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// A GSM modem on a serial port.
    #[cfg(feature = "hardware")]
    Serial { port: String, baud_rate: u32 },
    /// The in-process simulator.
    Simulator,
}

/// Construct the modem for `backend`.
///
/// No I/O happens here; the serial port is opened by each operation.
pub fn open(backend: &Backend) -> Result<Arc<dyn Modem>> {
    match backend {
        #[cfg(feature = "hardware")]
        Backend::Serial { port, baud_rate } => {
            let modem = at::GsmModemBuilder::new()
                .serial_port(port)
                .baud_rate(*baud_rate)
                .build()?;
            Ok(Arc::new(modem))
        }
        Backend::Simulator => Ok(Arc::new(SimulatorModem::new())),
    }
}
