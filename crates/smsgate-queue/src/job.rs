//! Job records tracked by the queue.
//!
//! A [`Job`] is created on admission, mutated only by the queue worker under
//! the store lock, and handed to callers as a clone. Its status only moves
//! forward: `queued -> sending -> {sent, failed}`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use smsgate_core::SendResult;

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Sending,
    Sent,
    Failed,
}

impl JobStatus {
    /// Sent or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// ```
    /// use smsgate_queue::JobStatus;
    ///
    /// assert!(JobStatus::Queued.can_transition_to(JobStatus::Sending));
    /// assert!(!JobStatus::Queued.can_transition_to(JobStatus::Sent));
    /// assert!(!JobStatus::Sent.can_transition_to(JobStatus::Queued));
    /// ```
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Sending)
                | (JobStatus::Sending, JobStatus::Sent)
                | (JobStatus::Sending, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Sending => "sending",
            JobStatus::Sent => "sent",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub phone: String,
    pub message: String,
    pub status: JobStatus,
    /// Present once the job has left `sending`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SendResult>,
    /// Present when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly admitted job with a new random ID.
    pub(crate) fn new(phone: &str, message: &str, now: DateTime<Utc>) -> Self {
        Job {
            id: generate_id(),
            phone: phone.to_string(),
            message: message.to_string(),
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, stamping `updated_at`. Returns `false` and leaves the
    /// job untouched if the transition is illegal.
    pub(crate) fn transition(&mut self, next: JobStatus, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }

    /// Record a successful send.
    pub(crate) fn complete(&mut self, result: SendResult, now: DateTime<Utc>) -> bool {
        if !self.transition(JobStatus::Sent, now) {
            return false;
        }
        self.result = Some(result);
        true
    }

    /// Record a failed send.
    pub(crate) fn fail(&mut self, error: String, now: DateTime<Utc>) -> bool {
        if !self.transition(JobStatus::Failed, now) {
            return false;
        }
        self.result = Some(SendResult::failed(error.clone()));
        self.error = Some(error);
        true
    }
}

/// 64 random bits as 16 lowercase hex digits.
///
/// No collision check is made against live jobs.
pub fn generate_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        use JobStatus::*;
        let all = [Queued, Sending, Sent, Failed];
        let legal = [(Queued, Sending), (Sending, Sent), (Sending, Failed)];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Sending.is_terminal());
        assert!(JobStatus::Sent.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn ids_are_sixteen_hex_digits() {
        let id = generate_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn transition_stamps_updated_at() {
        let t0 = Utc::now();
        let mut job = Job::new("+1", "hi", t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        assert!(job.transition(JobStatus::Sending, t1));
        assert_eq!(job.created_at, t0);
        assert_eq!(job.updated_at, t1);
    }

    #[test]
    fn illegal_transition_leaves_job_untouched() {
        let t0 = Utc::now();
        let mut job = Job::new("+1", "hi", t0);
        let later = t0 + chrono::Duration::seconds(1);
        assert!(!job.complete(SendResult::delivered(None), later));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.result, None);
        assert_eq!(job.updated_at, t0);
    }

    #[test]
    fn fail_records_result_and_error() {
        let t0 = Utc::now();
        let mut job = Job::new("+1", "hi", t0);
        job.transition(JobStatus::Sending, t0);
        assert!(job.fail("protocol error: modem not responding".into(), t0));
        assert_eq!(job.status, JobStatus::Failed);
        let result = job.result.as_ref().unwrap();
        assert!(!result.success);
        assert_eq!(job.error.as_deref(), Some("protocol error: modem not responding"));
    }

    #[test]
    fn json_shape() {
        let t0 = "2026-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
        let mut job = Job::new("+420123456789", "hi", t0);
        job.id = "00000000000000ff".into();

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "00000000000000ff",
                "phone": "+420123456789",
                "message": "hi",
                "status": "queued",
                "created_at": "2026-01-02T03:04:05Z",
                "updated_at": "2026-01-02T03:04:05Z",
            })
        );

        job.transition(JobStatus::Sending, t0);
        job.complete(SendResult::delivered(Some("42".into())), t0);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "sent");
        assert_eq!(
            json["result"],
            serde_json::json!({ "success": true, "message_reference": "42" })
        );
        assert!(json.get("error").is_none());
    }
}
