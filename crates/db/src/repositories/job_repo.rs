//! Repository for the `jobs` table.
//!
//! Every status transition is a conditional `UPDATE` guarded by the
//! expected prior status. The boolean result reports whether the guard
//! matched, so double claims and re-applied transitions are visible to the
//! caller and never overwrite a terminal job.

use lyricflow_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{Job, JobFailure, STALE_CLAIM_ERROR};
use crate::models::status::{JobStage, JobStatus};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, project_id, stage_id, status_id, retry_count, error_message, \
    run_after, claimed_at, completed_at, created_at, updated_at";

/// Provides queue operations for pipeline jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new pending job, eligible immediately.
    pub async fn enqueue(
        pool: &PgPool,
        project_id: DbId,
        stage: JobStage,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (project_id, stage_id, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(project_id)
            .bind(stage.id())
            .bind(JobStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Fetch up to `limit` pending jobs that are eligible at `now`,
    /// oldest first.
    pub async fn fetch_pending_batch(
        pool: &PgPool,
        limit: i64,
        now: Timestamp,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs \
             WHERE status_id = $1 AND run_after <= $2 \
             ORDER BY id ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Pending.id())
            .bind(now)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Move a job from `Pending` to `Processing`.
    ///
    /// Returns `false` if the job was not pending (already claimed by
    /// another dispatcher, or terminal).
    pub async fn claim(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, claimed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobStatus::Processing.id())
        .bind(JobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a job from `Processing` to `Completed`, clearing its error.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_message = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed attempt on a `Processing` job: back to `Pending`
    /// with a new `run_after`, or `Failed` when exhausted.
    ///
    /// `retry_count` only ever grows.
    pub async fn record_failure(
        pool: &PgPool,
        job_id: DbId,
        failure: &JobFailure,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, error_message = $3, \
                 retry_count = GREATEST(retry_count, $4), \
                 run_after = CASE WHEN $6 THEN run_after ELSE $5 END, \
                 completed_at = CASE WHEN $6 THEN NOW() ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status_id = $7",
        )
        .bind(job_id)
        .bind(failure.next_status().id())
        .bind(&failure.error_message)
        .bind(failure.retry_count)
        .bind(failure.run_after)
        .bind(failure.exhausted)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release jobs stuck in `Processing` since before `claimed_before`.
    ///
    /// Each counts as a failed attempt: the retry count grows by one (capped
    /// at `max_retries`) and the job goes back to `Pending`, or to `Failed`
    /// once the cap is reached. Returns the updated rows.
    pub async fn requeue_stale(
        pool: &PgPool,
        claimed_before: Timestamp,
        max_retries: i32,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET retry_count = LEAST(retry_count + 1, $3), \
                 status_id = CASE WHEN retry_count + 1 >= $3 THEN $4 ELSE $5 END, \
                 error_message = $6, \
                 run_after = CASE WHEN retry_count + 1 >= $3 THEN run_after ELSE NOW() END, \
                 completed_at = CASE WHEN retry_count + 1 >= $3 THEN NOW() ELSE NULL END, \
                 updated_at = NOW() \
             WHERE status_id = $2 AND claimed_at < $1 \
             RETURNING {COLUMNS}"
        );
        let mut jobs = sqlx::query_as::<_, Job>(&query)
            .bind(claimed_before)
            .bind(JobStatus::Processing.id())
            .bind(max_retries)
            .bind(JobStatus::Failed.id())
            .bind(JobStatus::Pending.id())
            .bind(STALE_CLAIM_ERROR)
            .fetch_all(pool)
            .await?;
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every job of a project in insertion order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE project_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Job>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
