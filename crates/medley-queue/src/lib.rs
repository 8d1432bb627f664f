//! Medley Job Queue
//!
//! The job-queue broker is an external collaborator; this crate defines the
//! `JobQueue` interface the dispatcher enqueues through and the worker-side
//! contract (handlers, progress, retry/backoff), plus an in-process broker
//! adapter the workers and tests run against.
//!
//! Five logical queues exist, each with an independent priority/retry/backoff
//! profile (see [`topology`]). Delivery is at-least-once: handlers must
//! tolerate re-delivery, e.g. by idempotently overwriting renditions.

pub mod job;
pub mod observer;
pub mod queue;
pub mod topology;

pub use job::{DeadJob, EnqueueOptions, Job};
pub use observer::{LoggingObserver, NoopObserver, QueueObserver};
pub use queue::{InMemoryJobQueue, JobContext, JobHandler, JobQueue, QueueRuntimeConfig};
pub use topology::{queue_profile, BackoffPolicy, Priority, QueueProfile, MAX_RETRY_BACKOFF_SECS};
