//! Storage seams used by the dispatcher and the submission facade.
//!
//! Two implementations exist: [`PgStore`](crate::postgres::PgStore) backed
//! by the repositories in `lyricflow-db`, and
//! [`MemoryStore`](crate::memory::MemoryStore) for tests and local runs.

use async_trait::async_trait;
use lyricflow_core::types::{DbId, Timestamp};
use lyricflow_db::models::job::{Job, JobFailure};
use lyricflow_db::models::lyrics::{CreateLyrics, Lyrics};
use lyricflow_db::models::project::{CreateProject, Project};
use lyricflow_db::models::status::{JobStage, ProjectStatus};

use crate::error::StoreError;
use crate::reducer::ProjectOutcome;

/// Durable record of pipeline jobs.
///
/// Status transitions are conditional on the expected prior status and
/// return `false` when the guard did not match. A `false` never changes
/// state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a `Pending` job, eligible immediately. Duplicates are allowed.
    async fn enqueue(&self, project_id: DbId, stage: JobStage) -> Result<Job, StoreError>;

    /// Up to `limit` pending jobs with `run_after <= now`, oldest first.
    async fn fetch_pending_batch(&self, limit: usize, now: Timestamp)
        -> Result<Vec<Job>, StoreError>;

    /// `Pending -> Processing`.
    async fn mark_processing(&self, job_id: DbId) -> Result<bool, StoreError>;

    /// `Processing -> Completed`, clearing the error.
    async fn mark_completed(&self, job_id: DbId) -> Result<bool, StoreError>;

    /// `Processing -> Pending` (retry) or `Processing -> Failed` (exhausted).
    async fn mark_failed(&self, job_id: DbId, failure: &JobFailure) -> Result<bool, StoreError>;

    /// Release `Processing` jobs claimed before `claimed_before`, counting
    /// the lost attempt against `max_retries`. Returns the released jobs,
    /// now `Pending` or (when out of attempts) `Failed`.
    async fn requeue_stale(
        &self,
        claimed_before: Timestamp,
        max_retries: i32,
    ) -> Result<Vec<Job>, StoreError>;

    async fn find_job(&self, job_id: DbId) -> Result<Option<Job>, StoreError>;

    async fn list_project_jobs(&self, project_id: DbId) -> Result<Vec<Job>, StoreError>;
}

/// Projects and their lyrics.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_project(
        &self,
        input: &CreateProject,
        status: ProjectStatus,
    ) -> Result<Project, StoreError>;

    async fn find_project(&self, project_id: DbId) -> Result<Option<Project>, StoreError>;

    /// Apply a stage outcome. Returns the updated project, or `None` if the
    /// project does not exist or the outcome was ignored.
    async fn apply_outcome(
        &self,
        project_id: DbId,
        outcome: &ProjectOutcome,
    ) -> Result<Option<Project>, StoreError>;

    async fn find_lyrics(&self, project_id: DbId) -> Result<Option<Lyrics>, StoreError>;

    /// Insert lyrics unless the project already has some. Returns `true`
    /// if this call created the record.
    async fn create_lyrics_if_absent(&self, input: &CreateLyrics) -> Result<bool, StoreError>;

    /// Insert or replace the lyrics of a project.
    async fn upsert_lyrics(&self, input: &CreateLyrics) -> Result<Lyrics, StoreError>;
}
