//! Timed lyric lines and the helpers shared by transcription, manual
//! edits and rendering.
//!
//! Lines are serialised with camelCase keys (`startTime`, `endTime`) so the
//! stored JSON matches what the transcription service and the editor
//! exchange.

use serde::{Deserialize, Serialize};

/// A single line of lyrics with its playback window in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl LyricLine {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }
}

/// Reasons a sequence of lyric lines is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LyricsError {
    #[error("line {index} starts before zero ({start_time}s)")]
    NegativeStart { index: usize, start_time: f64 },

    #[error("line {index} ends at {end_time}s, not after its start at {start_time}s")]
    EmptyWindow {
        index: usize,
        start_time: f64,
        end_time: f64,
    },

    #[error("line {index} starts at {start_time}s, before the previous line at {previous}s")]
    OutOfOrder {
        index: usize,
        start_time: f64,
        previous: f64,
    },

    #[error("line {index} has a non-finite timestamp")]
    NonFinite { index: usize },
}

/// Join the text of every line with newlines, in order.
pub fn format_lyrics_text(lines: &[LyricLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check that every line has a finite, non-negative, non-empty window and
/// that start times never go backwards.
pub fn validate_lines(lines: &[LyricLine]) -> Result<(), LyricsError> {
    let mut previous: Option<f64> = None;

    for (index, line) in lines.iter().enumerate() {
        if !line.start_time.is_finite() || !line.end_time.is_finite() {
            return Err(LyricsError::NonFinite { index });
        }
        if line.start_time < 0.0 {
            return Err(LyricsError::NegativeStart {
                index,
                start_time: line.start_time,
            });
        }
        if line.start_time >= line.end_time {
            return Err(LyricsError::EmptyWindow {
                index,
                start_time: line.start_time,
                end_time: line.end_time,
            });
        }
        if let Some(previous) = previous {
            if line.start_time < previous {
                return Err(LyricsError::OutOfOrder {
                    index,
                    start_time: line.start_time,
                    previous,
                });
            }
        }
        previous = Some(line.start_time);
    }

    Ok(())
}

/// Trim line text, drop blank lines, sort by start time (stable) and
/// validate the result.
pub fn normalize_lines(lines: Vec<LyricLine>) -> Result<Vec<LyricLine>, LyricsError> {
    let mut normalized: Vec<LyricLine> = lines
        .into_iter()
        .filter_map(|line| {
            let text = line.text.trim();
            if text.is_empty() {
                None
            } else {
                Some(LyricLine {
                    text: text.to_string(),
                    ..line
                })
            }
        })
        .collect();

    normalized.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    validate_lines(&normalized)?;
    Ok(normalized)
}

/// End time of the last line, if any.
pub fn last_end_time(lines: &[LyricLine]) -> Option<f64> {
    lines.last().map(|line| line.end_time)
}
