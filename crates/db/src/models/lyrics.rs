//! Lyrics attached to a project (one row per project).

use lyricflow_core::lyrics::{format_lyrics_text, LyricLine};
use lyricflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `lyrics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lyrics {
    pub id: DbId,
    pub project_id: DbId,
    /// Newline-joined text of every line.
    pub content: String,
    pub lines: Json<Vec<LyricLine>>,
    /// `true` when written by a user edit rather than transcription.
    pub is_edited: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for writing lyrics.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateLyrics {
    pub project_id: DbId,
    pub content: String,
    pub lines: Vec<LyricLine>,
    pub is_edited: bool,
}

impl CreateLyrics {
    /// Build the DTO, deriving `content` from the lines.
    pub fn from_lines(project_id: DbId, lines: Vec<LyricLine>, is_edited: bool) -> Self {
        Self {
            project_id,
            content: format_lyrics_text(&lines),
            lines,
            is_edited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_derived_from_lines() {
        let input = CreateLyrics::from_lines(
            7,
            vec![
                LyricLine::new("Hello", 0.0, 1.5),
                LyricLine::new("World", 1.5, 3.0),
            ],
            false,
        );
        assert_eq!(input.content, "Hello\nWorld");
        assert_eq!(input.project_id, 7);
        assert!(!input.is_edited);
    }
}
