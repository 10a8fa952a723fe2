//! Error types for the job pipeline.

use std::time::Duration;

use lyricflow_core::error::CoreError;
use lyricflow_core::lyrics::LyricsError;
use lyricflow_core::types::DbId;

/// The job or project store could not complete an operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A stage collaborator (style transfer, transcription, rendering) failed.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered but the payload was unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Why a single stage attempt failed. Every variant is retryable.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Project {0} not found")]
    ProjectNotFound(DbId),

    #[error("Lyrics not available for project {0}")]
    MissingLyrics(DbId),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Invalid lyrics: {0}")]
    InvalidLyrics(#[from] LyricsError),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced to callers of [`Pipeline`](crate::submit::Pipeline).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
