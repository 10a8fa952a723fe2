//! Background job dispatcher.
//!
//! Every `poll_interval` the dispatcher fetches a bounded batch of eligible
//! pending jobs and runs them one after another in fetch order. A failing
//! job is retried with backoff until it runs out of attempts, at which
//! point its project is marked failed. One job's failure never aborts the
//! rest of the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lyricflow_core::job_events::{
    EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_RETRY_SCHEDULED, EVENT_PROJECT_COMPLETED,
    EVENT_PROJECT_FAILED,
};
use lyricflow_core::retry::{RetryDecision, RetryPolicy};
use lyricflow_core::types::Timestamp;
use lyricflow_db::models::job::{Job, JobFailure, STALE_CLAIM_ERROR};
use lyricflow_db::models::status::JobStatus;
use lyricflow_events::{EventBus, PipelineEvent};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::collaborators::StageHandlers;
use crate::error::StageError;
use crate::reducer::ProjectOutcome;
use crate::stages::{StageRunner, StageSuccess};
use crate::store::{JobStore, ProjectStore};

/// Default polling interval for the dispatcher loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default number of jobs fetched per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default upper bound on a single collaborator call.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(600);

/// How long past the handler timeout a claim may stay in `Processing`
/// before the next cycle releases it.
pub const STALE_CLAIM_MARGIN: Duration = Duration::from_secs(60);

/// Tunables for [`JobDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub handler_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

/// Counts of what happened during one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Jobs moved to `Processing` by this cycle.
    pub claimed: usize,
    pub completed: usize,
    /// Failed attempts put back to `Pending`.
    pub retried: usize,
    /// Failed attempts with no retries left.
    pub failed: usize,
    /// Fetched jobs this cycle could not claim.
    pub skipped: usize,
    /// Stale claims put back to `Pending` at the start of the cycle.
    pub requeued: usize,
}

/// Polls the job store and runs pending jobs.
///
/// Construct with [`JobDispatcher::new`], then either drive cycles by hand
/// with [`run_cycle`](JobDispatcher::run_cycle) or spawn the periodic loop
/// with [`start`](JobDispatcher::start).
pub struct JobDispatcher {
    jobs: Arc<dyn JobStore>,
    projects: Arc<dyn ProjectStore>,
    runner: StageRunner,
    clock: Arc<dyn Clock>,
    events: Option<Arc<EventBus>>,
    config: DispatcherConfig,
    running: AtomicBool,
}

impl JobDispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        projects: Arc<dyn ProjectStore>,
        handlers: StageHandlers,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            runner: StageRunner::new(Arc::clone(&projects), handlers),
            jobs,
            projects,
            clock: Arc::new(SystemClock),
            events: None,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Read eligibility and backoff times from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish lifecycle events on `bus`.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Whether the background loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the polling loop.
    ///
    /// Returns `None` if this dispatcher's loop is already running.
    pub fn start(self: &Arc<Self>) -> Option<DispatcherHandle> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Job dispatcher already running, start ignored");
            return None;
        }

        let cancel = CancellationToken::new();
        let dispatcher = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let _running = RunningGuard(&dispatcher.running);
            dispatcher.run(token).await;
        });

        Some(DispatcherHandle {
            cancel,
            task: tokio::sync::Mutex::new(Some(task)),
        })
    }

    /// Run the loop until `cancel` is triggered.
    ///
    /// A cycle in progress is allowed to finish.
    async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_retries = self.config.retry.max_retries,
            "Job dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report != CycleReport::default() {
                        tracing::debug!(
                            claimed = report.claimed,
                            completed = report.completed,
                            retried = report.retried,
                            failed = report.failed,
                            skipped = report.skipped,
                            requeued = report.requeued,
                            "Dispatch cycle finished",
                        );
                    }
                }
            }
        }
    }

    /// One dispatch cycle: release stale claims, then fetch eligible jobs
    /// and run each in order.
    ///
    /// A store that cannot be reached yields an empty report; the next
    /// cycle tries again. A job left in `Processing` by such an outage is
    /// released once its claim is older than the handler timeout plus
    /// [`STALE_CLAIM_MARGIN`].
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let now = self.clock.now();

        self.release_stale_claims(now, &mut report).await;

        let batch = match self
            .jobs
            .fetch_pending_batch(self.config.batch_size, now)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch pending jobs");
                return report;
            }
        };

        for job in batch {
            self.process(job, &mut report).await;
        }
        report
    }

    async fn release_stale_claims(&self, now: Timestamp, report: &mut CycleReport) {
        let Some(cutoff) = self.stale_cutoff(now) else {
            return;
        };
        let max_retries = self.config.retry.max_retries.max(1);
        let released = match self.jobs.requeue_stale(cutoff, max_retries).await {
            Ok(released) => released,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to release stale job claims");
                return;
            }
        };

        for job in released {
            tracing::warn!(
                job_id = job.id,
                project_id = job.project_id,
                stage = %job.stage,
                retry_count = job.retry_count,
                "Released stale job claim",
            );
            if job.status == JobStatus::Failed {
                report.failed += 1;
                self.announce_exhausted(&job, job.retry_count, STALE_CLAIM_ERROR).await;
            } else {
                report.requeued += 1;
                self.announce_retry(&job, job.retry_count, Duration::ZERO, STALE_CLAIM_ERROR);
            }
        }
    }

    fn stale_cutoff(&self, now: Timestamp) -> Option<Timestamp> {
        let age = self.config.handler_timeout.checked_add(STALE_CLAIM_MARGIN)?;
        now.checked_sub_signed(chrono::Duration::from_std(age).ok()?)
    }

    async fn process(&self, job: Job, report: &mut CycleReport) {
        match self.jobs.mark_processing(job.id).await {
            Ok(true) => report.claimed += 1,
            Ok(false) => {
                tracing::debug!(job_id = job.id, "Job no longer pending, skipping");
                report.skipped += 1;
                return;
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to claim job");
                report.skipped += 1;
                return;
            }
        }

        tracing::info!(
            job_id = job.id,
            project_id = job.project_id,
            stage = %job.stage,
            attempt = job.retry_count + 1,
            "Job claimed",
        );

        let timeout = self.config.handler_timeout;
        let result = match tokio::time::timeout(timeout, self.runner.run(&job)).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout(timeout)),
        };

        match result {
            Ok(success) => self.on_success(&job, success, report).await,
            Err(e) => self.on_failure(&job, e, report).await,
        }
    }

    async fn on_success(&self, job: &Job, success: StageSuccess, report: &mut CycleReport) {
        match self.jobs.mark_completed(job.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id = job.id, "Job left processing before completion");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to mark job completed");
                return;
            }
        }

        report.completed += 1;
        tracing::info!(
            job_id = job.id,
            project_id = job.project_id,
            stage = %job.stage,
            "Job completed",
        );
        self.publish(job_event(EVENT_JOB_COMPLETED, job));

        if let StageSuccess::VideoRendered(output) = success {
            self.publish(job_event(EVENT_PROJECT_COMPLETED, job).with_payload(output.to_json()));
        }
    }

    async fn on_failure(&self, job: &Job, error: StageError, report: &mut CycleReport) {
        let decision = self.config.retry.on_failure(job.retry_count);
        let error_message = error.to_string();
        let run_after = match &decision {
            RetryDecision::Retry { delay, .. } => {
                let delay = chrono::Duration::from_std(*delay).unwrap_or(chrono::Duration::zero());
                self.clock.now() + delay
            }
            RetryDecision::Exhausted { .. } => self.clock.now(),
        };
        let failure = JobFailure {
            error_message: error_message.clone(),
            retry_count: decision.retry_count(),
            exhausted: decision.is_exhausted(),
            run_after,
        };

        match self.jobs.mark_failed(job.id, &failure).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id = job.id, "Job left processing before failure was recorded");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "Failed to record job failure");
                return;
            }
        }

        match decision {
            RetryDecision::Retry { retry_count, delay } => {
                report.retried += 1;
                tracing::warn!(
                    job_id = job.id,
                    project_id = job.project_id,
                    stage = %job.stage,
                    retry_count,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %error,
                    "Job failed, retry scheduled",
                );
                self.announce_retry(job, retry_count, delay, &error_message);
            }
            RetryDecision::Exhausted { retry_count } => {
                report.failed += 1;
                tracing::error!(
                    job_id = job.id,
                    project_id = job.project_id,
                    stage = %job.stage,
                    retry_count,
                    error = %error,
                    "Job failed, no retries left",
                );
                self.announce_exhausted(job, retry_count, &error_message).await;
            }
        }
    }

    fn announce_retry(&self, job: &Job, retry_count: i32, delay: Duration, error: &str) {
        self.publish(job_event(EVENT_JOB_RETRY_SCHEDULED, job).with_payload(json!({
            "retry_count": retry_count,
            "retry_in_ms": delay.as_millis() as u64,
            "error": error,
        })));
    }

    /// Publish `job.failed` and fold the failure into the project.
    async fn announce_exhausted(&self, job: &Job, retry_count: i32, error: &str) {
        self.publish(job_event(EVENT_JOB_FAILED, job).with_payload(json!({
            "retry_count": retry_count,
            "error": error,
        })));
        self.fail_project(job, error.to_string()).await;
    }

    async fn fail_project(&self, job: &Job, error: String) {
        let outcome = ProjectOutcome::StageExhausted {
            stage: job.stage,
            error,
        };
        match self.projects.apply_outcome(job.project_id, &outcome).await {
            Ok(Some(project)) => {
                self.publish(
                    job_event(EVENT_PROJECT_FAILED, job)
                        .with_payload(json!({ "error": project.error_message })),
                );
            }
            Ok(None) => {
                tracing::debug!(
                    project_id = job.project_id,
                    "Project missing or already completed, not marked failed",
                );
            }
            Err(e) => {
                tracing::error!(
                    project_id = job.project_id,
                    error = %e,
                    "Failed to mark project failed",
                );
            }
        }
    }

    fn publish(&self, event: PipelineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

fn job_event(event_type: &str, job: &Job) -> PipelineEvent {
    PipelineEvent::for_job(event_type, job.project_id, job.id, job.stage.as_str())
}

/// Clears the running flag when the loop task ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Controls a loop spawned by [`JobDispatcher::start`].
///
/// Dropping the handle cancels the loop without waiting for it.
pub struct DispatcherHandle {
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DispatcherHandle {
    /// Cancel the loop and wait for it to exit. Calling it again is a no-op.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Job dispatcher task ended abnormally");
            }
        }
    }

    /// `false` once [`stop`](Self::stop) has been requested.
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
