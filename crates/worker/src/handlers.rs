//! Pick a collaborator for each stage from the worker configuration.

use std::sync::Arc;

use lyricflow_pipeline::{StageHandlers, StyleTransfer, VideoRenderer};
use lyricflow_services::{
    PassthroughStyleTransfer, PlaceholderRenderer, RenderServiceClient, StyleTransferClient,
    WhisperClient,
};

use crate::config::WorkerConfig;

/// Remote clients where an endpoint is configured, local stand-ins
/// otherwise. Transcription is always remote.
pub fn stage_handlers(config: &WorkerConfig) -> StageHandlers {
    let style_transfer: Arc<dyn StyleTransfer> = match &config.style_transfer {
        Some(endpoint) => {
            tracing::info!(base_url = %endpoint.base_url, "Style transfer service configured");
            Arc::new(StyleTransferClient::new(endpoint.clone()))
        }
        None => {
            tracing::warn!("STYLE_TRANSFER_API_URL not set, original audio is kept");
            Arc::new(PassthroughStyleTransfer)
        }
    };

    let renderer: Arc<dyn VideoRenderer> = match &config.render {
        Some(endpoint) => {
            tracing::info!(base_url = %endpoint.base_url, "Render service configured");
            Arc::new(RenderServiceClient::new(endpoint.clone()))
        }
        None => {
            tracing::warn!("RENDER_API_URL not set, using placeholder renderer");
            Arc::new(PlaceholderRenderer::default())
        }
    };

    tracing::info!(
        base_url = %config.transcription.base_url,
        language = %config.transcription_language,
        "Transcription service configured",
    );
    let transcriber = Arc::new(WhisperClient::new(
        config.transcription.clone(),
        config.transcription_language.clone(),
    ));

    StageHandlers {
        style_transfer,
        transcriber,
        renderer,
    }
}
