//! JobQueue -- admission control, job store, and the single modem worker.
//!
//! The queue owns three things:
//! - a store mapping job ID to [`Job`], behind one mutex;
//! - a FIFO channel of admitted jobs, drained by one worker task that calls
//!   [`Modem::send_sms`] for each job in turn;
//! - a cleanup task that periodically [`sweep`](JobQueue::sweep)s old
//!   terminal jobs out of the store.
//!
//! Admission is bounded by a semaphore with `capacity` permits. A permit is
//! taken in [`enqueue`](JobQueue::enqueue) and travels with the job until the
//! worker has finished it, so the bound covers buffered jobs plus the one in
//! flight. `enqueue` never waits: with no permit left the job is rejected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use smsgate_core::Modem;

use crate::job::{Job, JobStatus};

/// Default number of jobs admitted at once.
pub const DEFAULT_CAPACITY: usize = 100;
/// Default time a finished job stays in the store before the sweep removes it.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);
/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Queue sizing and retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum admitted jobs not yet finished (buffered plus in flight).
    /// Values below 1 are treated as 1.
    pub capacity: usize,
    /// How long a sent or failed job is kept when nobody reads it.
    pub retention: Duration,
    /// How often the cleanup task runs.
    pub sweep_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            capacity: DEFAULT_CAPACITY,
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl QueueConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        QueueConfig {
            capacity,
            ..Default::default()
        }
    }
}

/// A job handed from `enqueue` to the worker.
struct Admitted {
    id: String,
    phone: String,
    message: String,
    /// Released when the worker is done with the job.
    _permit: OwnedSemaphorePermit,
}

/// State shared between the queue handle and its background tasks.
struct Shared {
    store: Mutex<HashMap<String, Job>>,
    pending: AtomicUsize,
    retention: chrono::TimeDelta,
}

impl Shared {
    fn store(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let mut store = self.store();
        let before = store.len();
        store.retain(|_, job| !(job.status.is_terminal() && job.updated_at < cutoff));
        before - store.len()
    }

    async fn process(&self, admitted: Admitted, modem: &dyn Modem) {
        let id = admitted.id.as_str();
        {
            let mut store = self.store();
            let Some(job) = store.get_mut(id) else {
                warn!(job_id = %id, "admitted job missing from store, skipping");
                return;
            };
            job.transition(JobStatus::Sending, Utc::now());
        }
        info!(job_id = %id, phone = %admitted.phone, "job sending");

        let outcome = modem.send_sms(&admitted.phone, &admitted.message).await;

        let mut store = self.store();
        let Some(job) = store.get_mut(id) else {
            warn!(job_id = %id, "job vanished while sending");
            return;
        };
        let now = Utc::now();
        match outcome {
            Ok(result) => {
                info!(
                    job_id = %id,
                    reference = ?result.message_reference,
                    warning = ?result.error,
                    "job sent"
                );
                job.complete(result, now);
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "job failed");
                job.fail(e.to_string(), now);
            }
        }
    }
}

/// Admission-controlled SMS job queue.
///
/// Must be created inside a Tokio runtime: [`new`](Self::new) spawns the
/// worker and cleanup tasks. Dropping the queue cancels both.
pub struct JobQueue {
    shared: Arc<Shared>,
    job_tx: mpsc::UnboundedSender<Admitted>,
    slots: Arc<Semaphore>,
    capacity: usize,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    /// Create the queue and start its background tasks.
    pub fn new(modem: Arc<dyn Modem>, config: QueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        let retention = chrono::TimeDelta::from_std(config.retention)
            .unwrap_or(chrono::TimeDelta::MAX);
        let shared = Arc::new(Shared {
            store: Mutex::new(HashMap::new()),
            pending: AtomicUsize::new(0),
            retention,
        });
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(worker_loop(
            Arc::clone(&shared),
            job_rx,
            modem,
            cancel.clone(),
        ));
        let cleanup = tokio::spawn(cleanup_loop(
            Arc::clone(&shared),
            config.sweep_interval,
            cancel.clone(),
        ));

        debug!(capacity, retention = ?config.retention, "job queue started");
        JobQueue {
            shared,
            job_tx,
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            cancel,
            tasks: Mutex::new(vec![worker, cleanup]),
        }
    }

    /// Admit a send request.
    ///
    /// Returns a copy of the new job (status `queued`), or `None` when the
    /// queue is at capacity or shut down. Never blocks.
    pub fn enqueue(&self, phone: &str, message: &str) -> Option<Job> {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!(phone, capacity = self.capacity, "queue full, rejecting job");
            return None;
        };

        let job = Job::new(phone, message, Utc::now());
        let id = job.id.clone();
        self.shared.store().insert(id.clone(), job.clone());
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        let admitted = Admitted {
            id: id.clone(),
            phone: phone.to_string(),
            message: message.to_string(),
            _permit: permit,
        };
        if self.job_tx.send(admitted).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            self.shared.store().remove(&id);
            warn!(job_id = %id, "worker stopped, rejecting job");
            return None;
        }

        info!(job_id = %id, phone, "job queued");
        Some(job)
    }

    /// Look up a job by ID.
    ///
    /// Returns a copy. A job that is already sent or failed is removed from
    /// the store by this read, so a second lookup returns `None`.
    pub fn get(&self, id: &str) -> Option<Job> {
        let mut store = self.shared.store();
        let status = store.get(id)?.status;
        if status.is_terminal() {
            debug!(job_id = %id, %status, "finished job read, removing");
            store.remove(id)
        } else {
            store.get(id).cloned()
        }
    }

    /// Jobs admitted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Jobs currently held in the store, in any state.
    pub fn len(&self) -> usize {
        self.shared.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove sent and failed jobs last updated before `now - retention`.
    /// Returns the number removed. Queued and sending jobs are never touched.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.shared.sweep(now)
    }

    /// Stop the worker and the cleanup task, and wait for both to exit.
    ///
    /// A send already in progress runs to completion first. Jobs still
    /// buffered are discarded and removed from the store, and further
    /// [`enqueue`](Self::enqueue) calls are rejected.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "queue task ended abnormally");
            }
        }
        debug!("job queue shut down");
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Drain admitted jobs in FIFO order, one send at a time.
///
/// Cancellation is only observed between jobs.
async fn worker_loop(
    shared: Arc<Shared>,
    mut job_rx: mpsc::UnboundedReceiver<Admitted>,
    modem: Arc<dyn Modem>,
    cancel: CancellationToken,
) {
    loop {
        let admitted = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("queue worker cancelled");
                break;
            }

            next = job_rx.recv() => match next {
                Some(admitted) => admitted,
                None => {
                    debug!("all queue handles dropped, exiting worker");
                    break;
                }
            },
        };
        shared.pending.fetch_sub(1, Ordering::SeqCst);
        shared.process(admitted, modem.as_ref()).await;
    }

    // Refuse further jobs, then discard whatever is still buffered.
    job_rx.close();
    let mut discarded = 0usize;
    while let Ok(admitted) = job_rx.try_recv() {
        shared.pending.fetch_sub(1, Ordering::SeqCst);
        shared.store().remove(&admitted.id);
        discarded += 1;
    }
    if discarded > 0 {
        warn!(discarded, "queue stopped with unsent jobs");
    }
}

async fn cleanup_loop(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("queue cleanup cancelled");
                break;
            }

            _ = ticker.tick() => {
                let removed = shared.sweep(Utc::now());
                if removed > 0 {
                    info!(removed, "queue cleanup removed finished jobs");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use smsgate_core::{Error, Result, SendResult, Status};

    /// A modem whose sends wait for a permit on `gate`, so tests decide
    /// when each send may finish.
    struct GatedModem {
        gate: Arc<Semaphore>,
        calls: Mutex<Vec<String>>,
    }

    impl GatedModem {
        fn closed() -> Arc<Self> {
            Self::with_permits(0)
        }

        fn open() -> Arc<Self> {
            Self::with_permits(Semaphore::MAX_PERMITS)
        }

        fn with_permits(permits: usize) -> Arc<Self> {
            Arc::new(GatedModem {
                gate: Arc::new(Semaphore::new(permits)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Modem for GatedModem {
        async fn status(&self) -> Result<Status> {
            Ok(Status::connected())
        }

        async fn send_sms(&self, phone: &str, _message: &str) -> Result<SendResult> {
            self.calls.lock().unwrap().push(phone.to_string());
            self.gate
                .acquire()
                .await
                .map_err(|_| Error::NotConnected)?
                .forget();
            if phone == "fail" {
                return Err(Error::Protocol("modem returned an error".into()));
            }
            let reference = self.calls.lock().unwrap().len();
            Ok(SendResult::delivered(Some(reference.to_string())))
        }
    }

    fn queue(modem: Arc<GatedModem>, capacity: usize) -> JobQueue {
        JobQueue::new(modem, QueueConfig::with_capacity(capacity))
    }

    /// Poll (without consuming) until the job reaches `status`.
    async fn wait_for_status(queue: &JobQueue, id: &str, status: JobStatus) {
        for _ in 0..1000 {
            let current = queue.shared.store().get(id).map(|j| j.status);
            if current == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached {status}");
    }

    #[test]
    fn config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.retention, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_admits_queued_jobs_with_unique_ids() {
        let queue = queue(GatedModem::closed(), 10);

        let a = queue.enqueue("+420123456789", "hi").unwrap();
        assert_eq!(a.status, JobStatus::Queued);
        assert_eq!(a.result, None);
        assert_eq!(queue.len(), 1);

        let b = queue.enqueue("+420123456789", "hi again").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_rejects_while_worker_is_busy() {
        let modem = GatedModem::closed();
        let queue = queue(Arc::clone(&modem), 1);

        let a = queue.enqueue("+420111111111", "first").unwrap();
        wait_for_status(&queue, &a.id, JobStatus::Sending).await;

        assert!(queue.enqueue("+420123456789", "hi").is_none());
        assert_eq!(queue.len(), 1);
        assert!(queue.get(&a.id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_excludes_job_in_flight() {
        let modem = GatedModem::closed();
        let queue = queue(Arc::clone(&modem), 3);

        let a = queue.enqueue("a", "1").unwrap();
        queue.enqueue("b", "2").unwrap();
        queue.enqueue("c", "3").unwrap();
        wait_for_status(&queue, &a.id, JobStatus::Sending).await;

        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.len(), 3);
        // The job in flight still holds its slot.
        assert!(queue.enqueue("d", "4").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_released_when_job_finishes() {
        let modem = GatedModem::closed();
        let queue = queue(Arc::clone(&modem), 1);

        let a = queue.enqueue("a", "1").unwrap();
        wait_for_status(&queue, &a.id, JobStatus::Sending).await;
        modem.gate.add_permits(1);
        wait_for_status(&queue, &a.id, JobStatus::Sent).await;

        // The permit is dropped right after the store update.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.enqueue("b", "2").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_job_is_sent_and_removed_on_read() {
        let queue = queue(GatedModem::open(), 10);
        let job = queue.enqueue("+420123456789", "hi").unwrap();
        wait_for_status(&queue, &job.id, JobStatus::Sent).await;

        let done = queue.get(&job.id).unwrap();
        assert_eq!(done.status, JobStatus::Sent);
        assert_eq!(done.error, None);
        let result = done.result.unwrap();
        assert!(result.success);
        assert_eq!(result.message_reference.as_deref(), Some("1"));
        assert!(done.updated_at >= done.created_at);

        assert!(queue.get(&job.id).is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_records_error() {
        let queue = queue(GatedModem::open(), 10);
        let job = queue.enqueue("fail", "hi").unwrap();
        wait_for_status(&queue, &job.id, JobStatus::Failed).await;

        let done = queue.get(&job.id).unwrap();
        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert!(!done.result.unwrap().success);
    }

    #[tokio::test(start_paused = true)]
    async fn get_does_not_remove_unfinished_jobs() {
        let queue = queue(GatedModem::closed(), 10);
        let a = queue.enqueue("a", "1").unwrap();
        let b = queue.enqueue("b", "2").unwrap();
        wait_for_status(&queue, &a.id, JobStatus::Sending).await;

        assert_eq!(queue.get(&a.id).unwrap().status, JobStatus::Sending);
        assert_eq!(queue.get(&b.id).unwrap().status, JobStatus::Queued);
        assert_eq!(queue.len(), 2);
        assert!(queue.get("0000000000000000").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_run_in_fifo_order_and_failures_do_not_stop_the_worker() {
        let modem = GatedModem::open();
        let queue = queue(Arc::clone(&modem), 10);

        let a = queue.enqueue("fail", "1").unwrap();
        let b = queue.enqueue("b", "2").unwrap();
        let c = queue.enqueue("c", "3").unwrap();
        wait_for_status(&queue, &c.id, JobStatus::Sent).await;

        assert_eq!(modem.calls(), vec!["fail", "b", "c"]);
        assert_eq!(queue.get(&a.id).unwrap().status, JobStatus::Failed);
        assert_eq!(queue.get(&b.id).unwrap().status, JobStatus::Sent);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_old_terminal_jobs() {
        // One send may finish; the second stalls in `sending`.
        let modem = GatedModem::with_permits(1);
        let queue = queue(Arc::clone(&modem), 10);

        let done = queue.enqueue("a", "1").unwrap();
        let stalled = queue.enqueue("b", "2").unwrap();
        let waiting = queue.enqueue("c", "3").unwrap();
        wait_for_status(&queue, &done.id, JobStatus::Sent).await;
        wait_for_status(&queue, &stalled.id, JobStatus::Sending).await;

        assert_eq!(queue.sweep(Utc::now()), 0);
        assert_eq!(queue.len(), 3);

        let later = Utc::now() + chrono::TimeDelta::minutes(6);
        assert_eq!(queue.sweep(later), 1);
        assert_eq!(queue.len(), 2);
        assert!(queue.get(&done.id).is_none());
        assert_eq!(queue.get(&stalled.id).unwrap().status, JobStatus::Sending);
        assert_eq!(queue.get(&waiting.id).unwrap().status, JobStatus::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_rejects_new_jobs() {
        let queue = queue(GatedModem::open(), 10);
        queue.shutdown().await;
        assert!(queue.enqueue("a", "1").is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_finishes_in_flight_and_discards_buffered() {
        let modem = GatedModem::closed();
        let queue = queue(Arc::clone(&modem), 10);

        let a = queue.enqueue("a", "1").unwrap();
        let b = queue.enqueue("b", "2").unwrap();
        let c = queue.enqueue("c", "3").unwrap();
        wait_for_status(&queue, &a.id, JobStatus::Sending).await;
        assert_eq!(queue.pending(), 2);

        tokio::join!(queue.shutdown(), async { modem.gate.add_permits(1) });

        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.len(), 1);
        assert!(queue.get(&b.id).is_none());
        assert!(queue.get(&c.id).is_none());
        assert_eq!(queue.get(&a.id).unwrap().status, JobStatus::Sent);
        assert_eq!(modem.calls(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_capacity_admits_one() {
        let queue = queue(GatedModem::closed(), 0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.enqueue("a", "1").is_some());
        assert!(queue.enqueue("b", "2").is_none());
    }
}
