//! Postgres-backed stores delegating to the `lyricflow-db` repositories.

use async_trait::async_trait;
use lyricflow_core::types::{DbId, Timestamp};
use lyricflow_db::models::job::{Job, JobFailure};
use lyricflow_db::models::lyrics::{CreateLyrics, Lyrics};
use lyricflow_db::models::project::{CreateProject, Project};
use lyricflow_db::models::status::{JobStage, ProjectStatus};
use lyricflow_db::repositories::{JobRepo, LyricsRepo, ProjectRepo};
use lyricflow_db::DbPool;

use crate::error::StoreError;
use crate::reducer::ProjectOutcome;
use crate::store::{JobStore, ProjectStore};

/// [`JobStore`] and [`ProjectStore`] over a Postgres pool.
///
/// Conditional transitions are single `UPDATE ... WHERE status_id = ...`
/// statements, so several workers may share one database.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn enqueue(&self, project_id: DbId, stage: JobStage) -> Result<Job, StoreError> {
        Ok(JobRepo::enqueue(&self.pool, project_id, stage).await?)
    }

    async fn fetch_pending_batch(
        &self,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<Job>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(JobRepo::fetch_pending_batch(&self.pool, limit, now).await?)
    }

    async fn mark_processing(&self, job_id: DbId) -> Result<bool, StoreError> {
        Ok(JobRepo::claim(&self.pool, job_id).await?)
    }

    async fn mark_completed(&self, job_id: DbId) -> Result<bool, StoreError> {
        Ok(JobRepo::complete(&self.pool, job_id).await?)
    }

    async fn mark_failed(&self, job_id: DbId, failure: &JobFailure) -> Result<bool, StoreError> {
        Ok(JobRepo::record_failure(&self.pool, job_id, failure).await?)
    }

    async fn requeue_stale(
        &self,
        claimed_before: Timestamp,
        max_retries: i32,
    ) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::requeue_stale(&self.pool, claimed_before, max_retries).await?)
    }

    async fn find_job(&self, job_id: DbId) -> Result<Option<Job>, StoreError> {
        Ok(JobRepo::find_by_id(&self.pool, job_id).await?)
    }

    async fn list_project_jobs(&self, project_id: DbId) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepo::list_by_project(&self.pool, project_id).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(
        &self,
        input: &CreateProject,
        status: ProjectStatus,
    ) -> Result<Project, StoreError> {
        Ok(ProjectRepo::create(&self.pool, input, status).await?)
    }

    async fn find_project(&self, project_id: DbId) -> Result<Option<Project>, StoreError> {
        Ok(ProjectRepo::find_by_id(&self.pool, project_id).await?)
    }

    async fn apply_outcome(
        &self,
        project_id: DbId,
        outcome: &ProjectOutcome,
    ) -> Result<Option<Project>, StoreError> {
        // One conditional UPDATE per outcome, matching `reducer::reduce`.
        let updated = match outcome {
            ProjectOutcome::AudioTransformed { url } => {
                ProjectRepo::set_transformed_audio(&self.pool, project_id, url).await?
            }
            ProjectOutcome::VideoRendered { video_url } => {
                ProjectRepo::complete_with_video(&self.pool, project_id, video_url).await?
            }
            ProjectOutcome::StageExhausted { stage, error } => {
                let message = ProjectOutcome::failure_message(*stage, error);
                ProjectRepo::mark_failed(&self.pool, project_id, &message).await?
            }
        };
        Ok(updated)
    }

    async fn find_lyrics(&self, project_id: DbId) -> Result<Option<Lyrics>, StoreError> {
        Ok(LyricsRepo::find_by_project(&self.pool, project_id).await?)
    }

    async fn create_lyrics_if_absent(&self, input: &CreateLyrics) -> Result<bool, StoreError> {
        Ok(LyricsRepo::create_if_absent(&self.pool, input)
            .await?
            .is_some())
    }

    async fn upsert_lyrics(&self, input: &CreateLyrics) -> Result<Lyrics, StoreError> {
        Ok(LyricsRepo::upsert(&self.pool, input).await?)
    }
}
