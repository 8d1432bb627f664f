use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medley_core::models::job::{JobPayload, QueueName};

/// A unit of work on a queue. Delivery is pulled → running → succeeded or
/// failed; exhausted jobs end up as [`DeadJob`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: QueueName,
    pub payload: JobPayload,
    /// Delivery attempts so far. 1 while the first delivery is running.
    pub attempt: u32,
    pub max_attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    /// Earliest time this job is eligible for delivery (enqueue delay or
    /// retry backoff).
    pub scheduled_at: DateTime<Utc>,
}

impl Job {
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

/// Per-enqueue overrides of the queue profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    /// Extra delay before first delivery, added to the queue's initial delay.
    pub delay: Option<Duration>,
    /// Override the queue's attempt budget.
    pub max_attempts: Option<u32>,
}

impl EnqueueOptions {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

/// A job that exhausted its attempt budget, parked for manual inspection
/// and `retry_processing`.
#[derive(Debug, Clone)]
pub struct DeadJob {
    pub job: Job,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}
