//! smsgate-queue: asynchronous SMS job tracking in front of a single modem.
//!
//! Callers [`enqueue`](JobQueue::enqueue) a send request and get a job ID
//! back at once; a single worker task performs the sends one at a time, and
//! callers poll [`get`](JobQueue::get) for the outcome. The queue works with
//! any [`Modem`](smsgate_core::Modem) backend.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smsgate_core::SimulatorModem;
//! use smsgate_queue::{JobQueue, QueueConfig};
//!
//! # async fn example() {
//! let queue = JobQueue::new(Arc::new(SimulatorModem::new()), QueueConfig::default());
//! if let Some(job) = queue.enqueue("+420123456789", "hello") {
//!     println!("queued {} ({} waiting)", job.id, queue.pending());
//! }
//! # }
//! ```

pub mod job;
pub mod queue;

pub use job::{Job, JobStatus};
pub use queue::{JobQueue, QueueConfig};
