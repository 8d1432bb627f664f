//! Queue topology: per-queue priority, retry, and backoff profiles.

use std::time::Duration;

use medley_core::models::job::QueueName;

/// Maximum backoff between retry attempts. Caps exponential backoff so high
/// attempt counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Queue scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Lowest = 1,
    Low = 3,
    Normal = 5,
    MediumHigh = 7,
    High = 9,
}

impl Priority {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

/// Backoff policy applied between retry attempts of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// `base * 2^(attempt-1)`, capped at [`MAX_RETRY_BACKOFF_SECS`].
    Exponential { base: Duration },
    /// Exponential plus a fixed extra delay on every retry. Used by the video
    /// queue, where immediate retries of an expensive transcode are wasteful.
    ExponentialPlusFixed { base: Duration, fixed: Duration },
}

impl BackoffPolicy {
    /// Delay before re-delivering a job that has failed `attempt` times
    /// (1-based). Computed in float so sub-second bases work in tests.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponential = |base: Duration| {
            let factor = 2u64.saturating_pow(attempt.saturating_sub(1)) as f64;
            Duration::from_secs_f64(
                (base.as_secs_f64() * factor).min(MAX_RETRY_BACKOFF_SECS as f64),
            )
        };
        match self {
            BackoffPolicy::Exponential { base } => exponential(*base),
            BackoffPolicy::ExponentialPlusFixed { base, fixed } => exponential(*base) + *fixed,
        }
    }
}

/// Retry/priority profile of a queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueProfile {
    pub priority: Priority,
    /// Total delivery attempts, including the first.
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Delay before the first delivery becomes eligible.
    pub initial_delay: Duration,
}

/// Default profile per queue. Illustrative defaults — tune per deployment
/// via [`crate::job::EnqueueOptions`] overrides.
pub fn queue_profile(queue: QueueName) -> QueueProfile {
    match queue {
        QueueName::AssetProcessing => QueueProfile {
            priority: Priority::High,
            max_attempts: 5,
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_secs(2),
            },
            initial_delay: Duration::ZERO,
        },
        QueueName::ImageProcessing => QueueProfile {
            priority: Priority::MediumHigh,
            max_attempts: 3,
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_secs(2),
            },
            initial_delay: Duration::ZERO,
        },
        QueueName::VideoProcessing => QueueProfile {
            priority: Priority::Low,
            max_attempts: 2,
            backoff: BackoffPolicy::ExponentialPlusFixed {
                base: Duration::from_secs(2),
                fixed: Duration::from_secs(5),
            },
            initial_delay: Duration::ZERO,
        },
        QueueName::MetadataExtraction => QueueProfile {
            priority: Priority::High,
            max_attempts: 3,
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_secs(2),
            },
            initial_delay: Duration::ZERO,
        },
        QueueName::Cleanup => QueueProfile {
            priority: Priority::Lowest,
            max_attempts: 5,
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_secs(2),
            },
            initial_delay: Duration::from_secs(30),
        },
    }
}
