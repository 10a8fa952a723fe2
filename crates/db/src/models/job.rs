//! Pipeline job rows and the failure record applied after a failed attempt.

use lyricflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{JobStage, JobStatus};

/// Error recorded on a job whose claim expired before its attempt finished.
pub const STALE_CLAIM_ERROR: &str = "Claim expired before the attempt finished";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub project_id: DbId,
    #[sqlx(rename = "stage_id")]
    pub stage: JobStage,
    #[sqlx(rename = "status_id")]
    pub status: JobStatus,
    pub retry_count: i32,
    pub error_message: Option<String>,
    /// Earliest time the job may be fetched for another attempt.
    pub run_after: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Outcome of a failed attempt, written by [`JobRepo::record_failure`].
///
/// [`JobRepo::record_failure`]: crate::repositories::JobRepo::record_failure
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub error_message: String,
    /// New retry count (previous count + 1).
    pub retry_count: i32,
    /// `true` when no attempts are left.
    pub exhausted: bool,
    /// When a retried job becomes eligible again. Ignored when exhausted.
    pub run_after: Timestamp,
}

impl JobFailure {
    /// `Failed` when exhausted, otherwise back to `Pending`.
    pub fn next_status(&self) -> JobStatus {
        if self.exhausted {
            JobStatus::Failed
        } else {
            JobStatus::Pending
        }
    }
}
