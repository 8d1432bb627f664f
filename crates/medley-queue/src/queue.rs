//! In-process job broker: per-queue worker pools, retry/backoff, progress,
//! dead-job parking, and cooperative shutdown.
//!
//! Delivery is at-least-once. A handler error re-schedules the job with the
//! queue's backoff until the attempt budget is exhausted, after which the job
//! is parked in the dead list for manual `retry_processing`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use medley_core::config::Config;
use medley_core::models::job::{JobPayload, QueueName};

use crate::job::{DeadJob, EnqueueOptions, Job};
use crate::observer::{LoggingObserver, QueueObserver};
use crate::topology::queue_profile;

/// Queue interface consumed by the dispatcher. The external broker sits
/// behind this trait; [`InMemoryJobQueue`] is the in-process adapter.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a payload on its queue. Returns the job id.
    async fn enqueue(&self, payload: JobPayload, options: EnqueueOptions) -> Result<Uuid>;
}

/// Handle given to a running job for progress reporting.
pub struct JobContext {
    job: Job,
    observer: Arc<dyn QueueObserver>,
    last_progress: AtomicU8,
}

impl JobContext {
    pub fn new(job: Job, observer: Arc<dyn QueueObserver>) -> Self {
        Self {
            job,
            observer,
            last_progress: AtomicU8::new(0),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Report a progress milestone (0-100). Values are clamped and must be
    /// monotonically increasing; stale values are dropped.
    pub fn update_progress(&self, percent: u8) {
        let percent = percent.min(100);
        let last = self.last_progress.load(Ordering::Relaxed);
        if percent <= last {
            return;
        }
        self.last_progress.store(percent, Ordering::Relaxed);
        self.observer.on_progress(&self.job, percent);
    }
}

/// A unit-of-work handler bound to one queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: &JobPayload, ctx: &JobContext) -> Result<()>;
}

/// Runtime knobs for the in-process broker.
#[derive(Debug, Clone)]
pub struct QueueRuntimeConfig {
    pub poll_interval: Duration,
    /// Hard ceiling on a single delivery; a timed-out job counts as a failed
    /// attempt.
    pub job_timeout: Duration,
    /// Parallel in-flight jobs per queue. Pools are independent; the video
    /// pool is deliberately small because each job is CPU/time expensive.
    pub concurrency: HashMap<QueueName, usize>,
}

impl Default for QueueRuntimeConfig {
    fn default() -> Self {
        let mut concurrency = HashMap::new();
        concurrency.insert(QueueName::MetadataExtraction, 4);
        concurrency.insert(QueueName::ImageProcessing, 4);
        concurrency.insert(QueueName::VideoProcessing, 1);
        concurrency.insert(QueueName::AssetProcessing, 2);
        concurrency.insert(QueueName::Cleanup, 2);
        Self {
            poll_interval: Duration::from_millis(200),
            job_timeout: Duration::from_secs(3600),
            concurrency,
        }
    }
}

impl QueueRuntimeConfig {
    /// Derive per-queue concurrency from application configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut runtime = Self::default();
        runtime
            .concurrency
            .insert(QueueName::MetadataExtraction, config.metadata_worker_concurrency);
        runtime
            .concurrency
            .insert(QueueName::ImageProcessing, config.image_worker_concurrency);
        runtime
            .concurrency
            .insert(QueueName::VideoProcessing, config.video_worker_concurrency);
        runtime
            .concurrency
            .insert(QueueName::AssetProcessing, config.generic_worker_concurrency);
        runtime
            .concurrency
            .insert(QueueName::Cleanup, config.cleanup_worker_concurrency);
        runtime
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

struct PendingJob {
    job: Job,
    ready_at: Instant,
}

struct QueueState {
    pending: Mutex<VecDeque<PendingJob>>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

/// In-process broker implementation of [`JobQueue`].
pub struct InMemoryJobQueue {
    queues: HashMap<QueueName, Arc<QueueState>>,
    handlers: RwLock<HashMap<QueueName, Arc<dyn JobHandler>>>,
    observer: Arc<dyn QueueObserver>,
    dead: Mutex<Vec<DeadJob>>,
    config: QueueRuntimeConfig,
    shutdown_tx: watch::Sender<bool>,
    pool_handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl InMemoryJobQueue {
    pub fn new(config: QueueRuntimeConfig) -> Arc<Self> {
        Self::with_observer(config, Arc::new(LoggingObserver))
    }

    pub fn with_observer(
        config: QueueRuntimeConfig,
        observer: Arc<dyn QueueObserver>,
    ) -> Arc<Self> {
        let mut queues = HashMap::new();
        for queue in QueueName::ALL {
            let concurrency = config.concurrency.get(&queue).copied().unwrap_or(1).max(1);
            queues.insert(
                queue,
                Arc::new(QueueState {
                    pending: Mutex::new(VecDeque::new()),
                    semaphore: Arc::new(Semaphore::new(concurrency)),
                    concurrency,
                }),
            );
        }
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            queues,
            handlers: RwLock::new(HashMap::new()),
            observer,
            dead: Mutex::new(Vec::new()),
            config,
            shutdown_tx,
            pool_handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Bind a handler to a queue. Jobs delivered on a queue without a handler
    /// are parked as dead.
    pub async fn register_handler(&self, queue: QueueName, handler: Arc<dyn JobHandler>) {
        self.handlers.write().await.insert(queue, handler);
    }

    /// Start one worker pool per queue. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handles = self.pool_handles.lock().await;
        for queue in QueueName::ALL {
            let this = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                this.run_pool(queue).await;
            }));
        }
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Job queue worker pools started"
        );
    }

    async fn run_pool(self: Arc<Self>, queue: QueueName) {
        let Some(state) = self.queues.get(&queue).cloned() else {
            return;
        };
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    tracing::info!(queue = %queue, "Worker pool shutting down");
                    break;
                }
                _ = sleep(self.config.poll_interval) => {
                    self.claim_and_dispatch(queue, &state).await;
                }
            }
        }
    }

    async fn claim_and_dispatch(self: &Arc<Self>, queue: QueueName, state: &Arc<QueueState>) {
        loop {
            let permit = match state.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let due = {
                let mut pending = state.pending.lock().await;
                let now = Instant::now();
                pending
                    .iter()
                    .position(|p| p.ready_at <= now)
                    .and_then(|i| pending.remove(i))
            };

            match due {
                Some(pending_job) => {
                    let this = Arc::clone(self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        this.run_job(queue, pending_job.job).await;
                    });
                }
                None => {
                    drop(permit);
                    return;
                }
            }
        }
    }

    async fn run_job(self: Arc<Self>, queue: QueueName, mut job: Job) {
        job.attempt += 1;
        self.observer.on_started(&job);

        let handler = self.handlers.read().await.get(&queue).cloned();
        let Some(handler) = handler else {
            let error = anyhow::anyhow!("No handler registered for queue {}", queue);
            self.observer.on_dead(&job, &error);
            self.dead.lock().await.push(DeadJob {
                job,
                error: error.to_string(),
                failed_at: Utc::now(),
            });
            return;
        };

        let ctx = JobContext::new(job.clone(), self.observer.clone());

        let outcome = match tokio::time::timeout(
            self.config.job_timeout,
            handler.handle(&job.payload, &ctx),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "Job timed out after {}s",
                self.config.job_timeout.as_secs()
            )),
        };

        match outcome {
            Ok(()) => {
                self.observer.on_completed(&job);
            }
            Err(error) => {
                if job.can_retry() {
                    let delay = queue_profile(queue).backoff.delay_for_attempt(job.attempt);
                    self.observer.on_retry_scheduled(&job, &error, delay);
                    let mut retried = job;
                    retried.scheduled_at = Utc::now()
                        + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
                    if let Some(state) = self.queues.get(&queue) {
                        state.pending.lock().await.push_back(PendingJob {
                            job: retried,
                            ready_at: Instant::now() + delay,
                        });
                    }
                } else {
                    self.observer.on_dead(&job, &error);
                    self.dead.lock().await.push(DeadJob {
                        job,
                        error: format!("{:#}", error),
                        failed_at: Utc::now(),
                    });
                }
            }
        }
    }

    /// Jobs that exhausted their attempt budget.
    pub async fn dead_jobs(&self) -> Vec<DeadJob> {
        self.dead.lock().await.clone()
    }

    /// Move a dead job back onto its queue with a fresh attempt budget.
    pub async fn requeue_dead(&self, job_id: Uuid) -> bool {
        let dead_job = {
            let mut dead = self.dead.lock().await;
            match dead.iter().position(|d| d.job.id == job_id) {
                Some(i) => dead.remove(i),
                None => return false,
            }
        };
        let mut job = dead_job.job;
        job.attempt = 0;
        job.scheduled_at = Utc::now();
        if let Some(state) = self.queues.get(&job.queue) {
            self.observer.on_enqueued(&job);
            state.pending.lock().await.push_back(PendingJob {
                job,
                ready_at: Instant::now(),
            });
            true
        } else {
            false
        }
    }

    /// Pending job count across all queues, for tests and introspection.
    pub async fn pending_count(&self) -> usize {
        let mut total = 0;
        for state in self.queues.values() {
            total += state.pending.lock().await.len();
        }
        total
    }

    /// Cooperative shutdown: stop claiming, then give in-flight jobs a
    /// bounded grace period before returning regardless.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!(grace_secs = grace.as_secs(), "Initiating job queue shutdown");
        let _ = self.shutdown_tx.send(true);

        let handles = std::mem::take(&mut *self.pool_handles.lock().await);
        for handle in handles {
            let _ = handle.await;
        }

        let drain = async {
            for state in self.queues.values() {
                let _ = state
                    .semaphore
                    .acquire_many(state.concurrency as u32)
                    .await;
            }
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("Shutdown grace period elapsed with jobs still in flight");
        }
        tracing::info!("Job queue stopped");
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, payload: JobPayload, options: EnqueueOptions) -> Result<Uuid> {
        let queue = payload.queue();
        let profile = queue_profile(queue);
        let delay = profile.initial_delay + options.delay.unwrap_or(Duration::ZERO);

        let job = Job {
            id: Uuid::new_v4(),
            queue,
            payload,
            attempt: 0,
            max_attempts: options.max_attempts.unwrap_or(profile.max_attempts).max(1),
            enqueued_at: Utc::now(),
            scheduled_at: Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero()),
        };

        let state = self
            .queues
            .get(&queue)
            .ok_or_else(|| anyhow::anyhow!("Unknown queue: {}", queue))?;

        self.observer.on_enqueued(&job);
        let id = job.id;
        state.pending.lock().await.push_back(PendingJob {
            job,
            ready_at: Instant::now() + delay,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> QueueRuntimeConfig {
        QueueRuntimeConfig::default().with_poll_interval(Duration::from_millis(10))
    }

    fn thumbnail_payload() -> JobPayload {
        JobPayload::GenerateThumbnails {
            asset_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            storage_key: "k".to_string(),
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail_first: usize,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _payload: &JobPayload, ctx: &JobContext) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.update_progress(50);
            ctx.update_progress(100);
            if call < self.fail_first {
                anyhow::bail!("transient failure {}", call);
            }
            Ok(())
        }
    }

    async fn wait_until<F: Fn() -> bool>(condition: F, max: Duration) -> bool {
        let deadline = Instant::now() + max;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_is_delivered_and_completed() {
        let queue = InMemoryJobQueue::new(fast_config());
        let calls = Arc::new(AtomicUsize::new(0));
        queue
            .register_handler(
                QueueName::ImageProcessing,
                Arc::new(CountingHandler {
                    calls: calls.clone(),
                    fail_first: 0,
                }),
            )
            .await;
        queue.start().await;

        queue
            .enqueue(thumbnail_payload(), EnqueueOptions::default())
            .await
            .unwrap();

        let calls_check = calls.clone();
        assert!(
            wait_until(
                move || calls_check.load(Ordering::SeqCst) == 1,
                Duration::from_secs(10)
            )
            .await
        );
        assert!(queue.dead_jobs().await.is_empty());

        queue.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_retries_with_backoff_then_succeeds() {
        let queue = InMemoryJobQueue::new(fast_config());
        let calls = Arc::new(AtomicUsize::new(0));
        // image-processing allows 3 attempts; fail the first two.
        queue
            .register_handler(
                QueueName::ImageProcessing,
                Arc::new(CountingHandler {
                    calls: calls.clone(),
                    fail_first: 2,
                }),
            )
            .await;
        queue.start().await;

        queue
            .enqueue(thumbnail_payload(), EnqueueOptions::default())
            .await
            .unwrap();

        let calls_check = calls.clone();
        assert!(
            wait_until(
                move || calls_check.load(Ordering::SeqCst) == 3,
                Duration::from_secs(60)
            )
            .await
        );
        assert!(queue.dead_jobs().await.is_empty());

        queue.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_job_is_parked_dead_and_can_be_requeued() {
        let queue = InMemoryJobQueue::new(fast_config());
        let calls = Arc::new(AtomicUsize::new(0));
        queue
            .register_handler(
                QueueName::ImageProcessing,
                Arc::new(CountingHandler {
                    calls: calls.clone(),
                    // Fails the first 3 attempts (the whole budget), succeeds after.
                    fail_first: 3,
                }),
            )
            .await;
        queue.start().await;

        let job_id = queue
            .enqueue(thumbnail_payload(), EnqueueOptions::default())
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(120);
        while queue.dead_jobs().await.is_empty() {
            assert!(Instant::now() < deadline, "job was never parked as dead");
            sleep(Duration::from_millis(10)).await;
        }

        let dead = queue.dead_jobs().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].job.id, job_id);
        assert_eq!(dead[0].job.attempt, 3);
        assert!(dead[0].error.contains("transient failure"));

        assert!(queue.requeue_dead(job_id).await);
        let calls_check = calls.clone();
        assert!(
            wait_until(
                move || calls_check.load(Ordering::SeqCst) == 4,
                Duration::from_secs(60)
            )
            .await
        );
        assert!(queue.dead_jobs().await.is_empty());

        queue.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhandled_queue_parks_job_dead() {
        let queue = InMemoryJobQueue::new(fast_config());
        queue.start().await;

        queue
            .enqueue(thumbnail_payload(), EnqueueOptions::default())
            .await
            .unwrap();

        sleep(Duration::from_secs(1)).await;
        let dead = queue.dead_jobs().await;
        assert_eq!(dead.len(), 1);
        assert!(dead[0].error.contains("No handler registered"));

        queue.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_delay_defers_delivery() {
        let queue = InMemoryJobQueue::new(fast_config());
        let calls = Arc::new(AtomicUsize::new(0));
        queue
            .register_handler(
                QueueName::ImageProcessing,
                Arc::new(CountingHandler {
                    calls: calls.clone(),
                    fail_first: 0,
                }),
            )
            .await;
        queue.start().await;

        queue
            .enqueue(
                thumbnail_payload(),
                EnqueueOptions::delayed(Duration::from_secs(30)),
            )
            .await
            .unwrap();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let calls_check = calls.clone();
        assert!(
            wait_until(
                move || calls_check.load(Ordering::SeqCst) == 1,
                Duration::from_secs(60)
            )
            .await
        );

        queue.shutdown(Duration::from_secs(5)).await;
    }

    #[test]
    fn test_progress_is_monotone_and_clamped() {
        let job = Job {
            id: Uuid::new_v4(),
            queue: QueueName::VideoProcessing,
            payload: thumbnail_payload(),
            attempt: 1,
            max_attempts: 2,
            enqueued_at: Utc::now(),
            scheduled_at: Utc::now(),
        };

        #[derive(Default)]
        struct Recorder {
            seen: std::sync::Mutex<Vec<u8>>,
        }
        impl QueueObserver for Recorder {
            fn on_progress(&self, _job: &Job, percent: u8) {
                self.seen.lock().unwrap().push(percent);
            }
        }

        let recorder = Arc::new(Recorder::default());
        let ctx = JobContext::new(job, recorder.clone());

        ctx.update_progress(10);
        ctx.update_progress(5); // stale, dropped
        ctx.update_progress(10); // duplicate, dropped
        ctx.update_progress(150); // clamped to 100
        ctx.update_progress(100); // already at 100

        assert_eq!(*recorder.seen.lock().unwrap(), vec![10, 100]);
    }
}
