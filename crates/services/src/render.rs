//! Lyric-video rendering.

use async_trait::async_trait;
use lyricflow_core::catalog::{theme_palette, ThemePalette};
use lyricflow_core::lyrics::LyricLine;
use lyricflow_core::render::{estimate_duration_secs, RenderQuality};
use lyricflow_pipeline::{CollaboratorError, RenderOutput, RenderRequest, VideoRenderer};
use serde::{Deserialize, Serialize};

use crate::api::{ServiceClient, ServiceEndpoint};

const RENDERS_PATH: &str = "/v1/renders";

/// URL reported by [`PlaceholderRenderer`] unless configured otherwise.
pub const PLACEHOLDER_VIDEO_URL: &str = "https://example.com/video.mp4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderJobRequest<'a> {
    audio_url: &'a str,
    lyrics: &'a [LyricLine],
    background_theme: &'a str,
    palette: ThemePalette,
    quality: RenderQuality,
    resolution: &'static str,
}

impl<'a> From<&'a RenderRequest> for RenderJobRequest<'a> {
    fn from(request: &'a RenderRequest) -> Self {
        Self {
            audio_url: &request.audio_url,
            lyrics: &request.lyrics,
            background_theme: &request.background_theme,
            palette: theme_palette(&request.background_theme),
            quality: request.quality,
            resolution: request.quality.resolution(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderJobResponse {
    video_url: String,
    duration: Option<f64>,
    resolution: Option<String>,
    file_size: Option<i64>,
}

/// Client for a remote rendering service.
pub struct RenderServiceClient {
    api: ServiceClient,
}

impl RenderServiceClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            api: ServiceClient::new(endpoint),
        }
    }
}

#[async_trait]
impl VideoRenderer for RenderServiceClient {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, CollaboratorError> {
        tracing::info!(
            audio_url = %request.audio_url,
            lines = request.lyrics.len(),
            theme = %request.background_theme,
            quality = %request.quality,
            "Submitting render",
        );
        let response: RenderJobResponse = self
            .api
            .post_json(RENDERS_PATH, &RenderJobRequest::from(request))
            .await?;

        // Missing metadata falls back to the same estimates as the placeholder.
        Ok(RenderOutput {
            video_url: response.video_url,
            duration_secs: response
                .duration
                .unwrap_or_else(|| estimate_duration_secs(&request.lyrics)),
            resolution: response
                .resolution
                .unwrap_or_else(|| request.quality.resolution().to_string()),
            file_size_bytes: response
                .file_size
                .unwrap_or_else(|| request.quality.estimated_file_size_bytes()),
        })
    }
}

/// Reports a finished video without rendering anything.
///
/// Duration comes from the last lyric line, resolution and size from the
/// requested quality.
#[derive(Debug, Clone)]
pub struct PlaceholderRenderer {
    video_url: String,
}

impl PlaceholderRenderer {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
        }
    }
}

impl Default for PlaceholderRenderer {
    fn default() -> Self {
        Self::new(PLACEHOLDER_VIDEO_URL)
    }
}

#[async_trait]
impl VideoRenderer for PlaceholderRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, CollaboratorError> {
        tracing::info!(
            audio_url = %request.audio_url,
            lines = request.lyrics.len(),
            theme = %request.background_theme,
            quality = %request.quality,
            "Placeholder render",
        );
        Ok(RenderOutput {
            video_url: self.video_url.clone(),
            duration_secs: estimate_duration_secs(&request.lyrics),
            resolution: request.quality.resolution().to_string(),
            file_size_bytes: request.quality.estimated_file_size_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(quality: RenderQuality, lyrics: Vec<LyricLine>) -> RenderRequest {
        RenderRequest {
            audio_url: "a.mp3".to_string(),
            lyrics,
            background_theme: "gradient".to_string(),
            quality,
        }
    }

    #[tokio::test]
    async fn placeholder_uses_last_line_and_quality() {
        let output = PlaceholderRenderer::default()
            .render(&request(
                RenderQuality::Hd1080,
                vec![
                    LyricLine::new("Hello", 0.0, 1.5),
                    LyricLine::new("World", 1.5, 3.0),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(output.video_url, PLACEHOLDER_VIDEO_URL);
        assert_eq!(output.duration_secs, 3.0);
        assert_eq!(output.resolution, "1920x1080");
        assert_eq!(output.file_size_bytes, 150 * 1024 * 1024);
    }

    #[tokio::test]
    async fn placeholder_without_lyrics_is_sixty_seconds_at_720p() {
        let output = PlaceholderRenderer::new("https://cdn.example.com/v.mp4")
            .render(&request(RenderQuality::Hd720, Vec::new()))
            .await
            .unwrap();

        assert_eq!(output.duration_secs, 60.0);
        assert_eq!(output.resolution, "1280x720");
        assert_eq!(output.file_size_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn request_body_includes_palette() {
        let req = request(RenderQuality::Hd1080, vec![LyricLine::new("Hi", 0.0, 1.0)]);
        let body = serde_json::to_value(RenderJobRequest::from(&req)).unwrap();

        assert_eq!(body["quality"], "1080p");
        assert_eq!(body["resolution"], "1920x1080");
        assert_eq!(body["backgroundTheme"], "gradient");
        assert_eq!(
            body["palette"],
            serde_json::json!({"gradient": "linear-gradient(135deg, #667eea 0%, #764ba2 100%)"})
        );
        assert_eq!(body["lyrics"][0]["startTime"], 0.0);
    }
}
