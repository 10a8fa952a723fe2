//! Repository for the `lyrics` table.

use lyricflow_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::lyrics::{CreateLyrics, Lyrics};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, content, lines, is_edited, created_at, updated_at";

/// Provides read and write operations for project lyrics.
pub struct LyricsRepo;

impl LyricsRepo {
    /// Find the lyrics of a project.
    pub async fn find_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<Lyrics>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lyrics WHERE project_id = $1");
        sqlx::query_as::<_, Lyrics>(&query)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert lyrics unless the project already has some.
    ///
    /// Returns `None` when a row already existed (first writer wins).
    pub async fn create_if_absent(
        pool: &PgPool,
        input: &CreateLyrics,
    ) -> Result<Option<Lyrics>, sqlx::Error> {
        let query = format!(
            "INSERT INTO lyrics (project_id, content, lines, is_edited) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (project_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lyrics>(&query)
            .bind(input.project_id)
            .bind(&input.content)
            .bind(Json(&input.lines))
            .bind(input.is_edited)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the lyrics of a project.
    pub async fn upsert(pool: &PgPool, input: &CreateLyrics) -> Result<Lyrics, sqlx::Error> {
        let query = format!(
            "INSERT INTO lyrics (project_id, content, lines, is_edited) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (project_id) DO UPDATE SET \
                 content = EXCLUDED.content, \
                 lines = EXCLUDED.lines, \
                 is_edited = EXCLUDED.is_edited, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Lyrics>(&query)
            .bind(input.project_id)
            .bind(&input.content)
            .bind(Json(&input.lines))
            .bind(input.is_edited)
            .fetch_one(pool)
            .await
    }
}
