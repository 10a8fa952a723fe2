//! Project entity model and DTOs.

use lyricflow_core::catalog::{
    is_supported_background_theme, is_supported_music_style, DEFAULT_BACKGROUND_THEME,
};
use lyricflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::status::ProjectStatus;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub original_audio_url: String,
    /// Set once style transfer succeeds.
    pub transformed_audio_url: Option<String>,
    /// Set once video rendering succeeds.
    pub video_url: Option<String>,
    pub music_style: String,
    pub background_theme: String,
    #[sqlx(rename = "status_id")]
    pub status: ProjectStatus,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// The freshest audio available: transformed if present, else the upload.
    pub fn latest_audio_url(&self) -> &str {
        self.transformed_audio_url
            .as_deref()
            .unwrap_or(&self.original_audio_url)
    }
}

/// DTO for creating a new project from an uploaded audio file.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(url)]
    pub original_audio_url: String,
    #[validate(custom(function = "validate_music_style"))]
    pub music_style: String,
    /// Defaults to `dark` if omitted.
    #[serde(default = "default_background_theme")]
    #[validate(custom(function = "validate_background_theme"))]
    pub background_theme: String,
}

fn default_background_theme() -> String {
    DEFAULT_BACKGROUND_THEME.to_string()
}

fn validate_music_style(style: &str) -> Result<(), ValidationError> {
    if is_supported_music_style(style) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_music_style"))
    }
}

fn validate_background_theme(theme: &str) -> Result<(), ValidationError> {
    if is_supported_background_theme(theme) {
        Ok(())
    } else {
        Err(ValidationError::new("unsupported_background_theme"))
    }
}
