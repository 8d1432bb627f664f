//! Queue lifecycle observer.
//!
//! A structured observer invoked synchronously at defined lifecycle points,
//! in place of ad-hoc event callbacks. The default [`LoggingObserver`] emits
//! structured tracing events; metrics backends implement the same trait.

use std::time::Duration;

use crate::job::Job;

/// Synchronous hooks for job lifecycle events.
pub trait QueueObserver: Send + Sync {
    fn on_enqueued(&self, _job: &Job) {}
    fn on_started(&self, _job: &Job) {}
    /// Progress milestones, monotonically increasing 0-100.
    fn on_progress(&self, _job: &Job, _percent: u8) {}
    fn on_completed(&self, _job: &Job) {}
    fn on_retry_scheduled(&self, _job: &Job, _error: &anyhow::Error, _delay: Duration) {}
    fn on_dead(&self, _job: &Job, _error: &anyhow::Error) {}
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueueObserver for NoopObserver {}

/// Default observer: structured tracing events per lifecycle point.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl QueueObserver for LoggingObserver {
    fn on_enqueued(&self, job: &Job) {
        tracing::info!(
            job_id = %job.id,
            queue = %job.queue,
            job_kind = job.payload.kind(),
            asset_id = %job.payload.asset_id(),
            "Job enqueued"
        );
    }

    fn on_started(&self, job: &Job) {
        tracing::info!(
            job_id = %job.id,
            queue = %job.queue,
            job_kind = job.payload.kind(),
            attempt = job.attempt,
            "Job started"
        );
    }

    fn on_progress(&self, job: &Job, percent: u8) {
        tracing::debug!(
            job_id = %job.id,
            queue = %job.queue,
            progress = percent,
            "Job progress"
        );
    }

    fn on_completed(&self, job: &Job) {
        tracing::info!(
            job_id = %job.id,
            queue = %job.queue,
            job_kind = job.payload.kind(),
            attempt = job.attempt,
            "Job completed"
        );
    }

    fn on_retry_scheduled(&self, job: &Job, error: &anyhow::Error, delay: Duration) {
        tracing::warn!(
            job_id = %job.id,
            queue = %job.queue,
            job_kind = job.payload.kind(),
            attempt = job.attempt,
            max_attempts = job.max_attempts,
            backoff_secs = delay.as_secs_f64(),
            error = %error,
            "Job failed, retry scheduled"
        );
    }

    fn on_dead(&self, job: &Job, error: &anyhow::Error) {
        tracing::error!(
            job_id = %job.id,
            queue = %job.queue,
            job_kind = job.payload.kind(),
            attempt = job.attempt,
            error = %error,
            "Job failed after maximum attempts, parked as dead"
        );
    }
}
