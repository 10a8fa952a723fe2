//! Repository for the `projects` table.

use lyricflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project};
use crate::models::status::ProjectStatus;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, title, original_audio_url, transformed_audio_url, video_url, \
    music_style, background_theme, status_id, error_message, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project with the given initial status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProject,
        status: ProjectStatus,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (title, original_audio_url, music_style, background_theme, status_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.title)
            .bind(&input.original_audio_url)
            .bind(&input.music_style)
            .bind(&input.background_theme)
            .bind(status.id())
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record the style-transferred audio URL.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn set_transformed_audio(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET transformed_audio_url = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    /// Record the rendered video and mark the project completed.
    ///
    /// Clears any error left by an earlier failed stage.
    pub async fn complete_with_video(
        pool: &PgPool,
        id: DbId,
        video_url: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects \
             SET video_url = $2, status_id = $3, error_message = NULL, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(video_url)
            .bind(ProjectStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark the project failed with an error message.
    ///
    /// A completed project is left untouched; `None` is returned in that
    /// case as well as when the row does not exist. The in-memory store
    /// applies the same rule in `lyricflow_pipeline::reducer::reduce`.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects \
             SET status_id = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id <> $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(ProjectStatus::Failed.id())
            .bind(error_message)
            .bind(ProjectStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }
}
