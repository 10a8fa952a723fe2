//! Narrow async interfaces to the three stage collaborators.
//!
//! Implementations live outside this crate (HTTP clients, local
//! stand-ins, test fakes). They may be slow and fallible; the dispatcher
//! bounds every call with a timeout.

use std::sync::Arc;

use async_trait::async_trait;
use lyricflow_core::lyrics::LyricLine;
use lyricflow_core::render::RenderQuality;
use serde_json::json;

use crate::error::CollaboratorError;

/// Result of a successful style transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTransferOutput {
    pub transformed_audio_url: String,
}

/// Re-arranges a track into another musical style.
#[async_trait]
pub trait StyleTransfer: Send + Sync {
    async fn transform(
        &self,
        audio_url: &str,
        target_style: &str,
    ) -> Result<StyleTransferOutput, CollaboratorError>;
}

/// Produces timed lyric lines from an audio track.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> Result<Vec<LyricLine>, CollaboratorError>;
}

/// Everything a renderer needs to produce a lyric video.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub audio_url: String,
    pub lyrics: Vec<LyricLine>,
    pub background_theme: String,
    pub quality: RenderQuality,
}

/// A finished video.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub video_url: String,
    pub duration_secs: f64,
    /// `WIDTHxHEIGHT`.
    pub resolution: String,
    pub file_size_bytes: i64,
}

impl RenderOutput {
    /// Summary attached to the `project.completed` event.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "video_url": self.video_url,
            "duration_secs": self.duration_secs,
            "resolution": self.resolution,
            "file_size_bytes": self.file_size_bytes,
        })
    }
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, CollaboratorError>;
}

/// The collaborator for each stage.
#[derive(Clone)]
pub struct StageHandlers {
    pub style_transfer: Arc<dyn StyleTransfer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub renderer: Arc<dyn VideoRenderer>,
}
