//! Event type names published on the pipeline event bus.

/// A job finished successfully.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";

/// A job failed and was put back to pending for another attempt.
pub const EVENT_JOB_RETRY_SCHEDULED: &str = "job.retry_scheduled";

/// A job failed and has no attempts left.
pub const EVENT_JOB_FAILED: &str = "job.failed";

/// A project's video was rendered.
pub const EVENT_PROJECT_COMPLETED: &str = "project.completed";

/// A project was marked failed after one of its jobs ran out of retries.
pub const EVENT_PROJECT_FAILED: &str = "project.failed";
