//! Lyric transcription through a Whisper-compatible HTTP service.

use async_trait::async_trait;
use lyricflow_core::lyrics::LyricLine;
use lyricflow_pipeline::{CollaboratorError, Transcriber};
use serde::{Deserialize, Serialize};

use crate::api::{ServiceClient, ServiceEndpoint};

const TRANSCRIPTIONS_PATH: &str = "/v1/transcriptions";

/// Hint sent with every request.
pub const TRANSCRIPTION_PROMPT: &str = "Transcribe the lyrics of this song";

/// Language assumed when none is configured.
pub const DEFAULT_LANGUAGE: &str = "fr";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptionRequest<'a> {
    audio_url: &'a str,
    language: &'a str,
    prompt: &'static str,
}

/// One timed segment of a transcription.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    segments: Option<Vec<Segment>>,
}

/// Turn segments into lyric lines: text trimmed, blank segments dropped.
pub fn segments_to_lyric_lines(segments: Vec<Segment>) -> Vec<LyricLine> {
    segments
        .into_iter()
        .filter_map(|segment| {
            let text = segment.text?.trim().to_string();
            (!text.is_empty()).then(|| LyricLine::new(text, segment.start, segment.end))
        })
        .collect()
}

pub struct WhisperClient {
    api: ServiceClient,
    language: String,
}

impl WhisperClient {
    pub fn new(endpoint: ServiceEndpoint, language: impl Into<String>) -> Self {
        Self {
            api: ServiceClient::new(endpoint),
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio_url: &str) -> Result<Vec<LyricLine>, CollaboratorError> {
        let request = TranscriptionRequest {
            audio_url,
            language: &self.language,
            prompt: TRANSCRIPTION_PROMPT,
        };
        let response: TranscriptionResponse =
            self.api.post_json(TRANSCRIPTIONS_PATH, &request).await?;

        let segments = response.segments.ok_or_else(|| {
            CollaboratorError::InvalidResponse("transcription has no segments".to_string())
        })?;
        let lines = segments_to_lyric_lines(segments);
        tracing::info!(audio_url, lines = lines.len(), "Transcription finished");
        Ok(lines)
    }
}
