//! Style transfer: re-arrange a track into a target genre.

use async_trait::async_trait;
use lyricflow_pipeline::{CollaboratorError, StyleTransfer, StyleTransferOutput};
use serde::{Deserialize, Serialize};

use crate::api::{ServiceClient, ServiceEndpoint};

const GENRE_SWAP_PATH: &str = "/v1/genre-swap";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenreSwapRequest<'a> {
    audio_url: &'a str,
    target_genre: &'a str,
    preserve_vocals: bool,
    intensity: &'static str,
}

impl<'a> GenreSwapRequest<'a> {
    fn new(audio_url: &'a str, target_genre: &'a str) -> Self {
        Self {
            audio_url,
            target_genre,
            preserve_vocals: true,
            intensity: "high",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenreSwapResponse {
    transformed_url: String,
}

/// Client for the genre-swap HTTP service.
pub struct StyleTransferClient {
    api: ServiceClient,
}

impl StyleTransferClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            api: ServiceClient::new(endpoint),
        }
    }
}

#[async_trait]
impl StyleTransfer for StyleTransferClient {
    async fn transform(
        &self,
        audio_url: &str,
        target_style: &str,
    ) -> Result<StyleTransferOutput, CollaboratorError> {
        tracing::debug!(audio_url, target_style, "Requesting genre swap");
        let response: GenreSwapResponse = self
            .api
            .post_json(GENRE_SWAP_PATH, &GenreSwapRequest::new(audio_url, target_style))
            .await?;

        if response.transformed_url.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "genre swap returned an empty URL".to_string(),
            ));
        }
        Ok(StyleTransferOutput {
            transformed_audio_url: response.transformed_url,
        })
    }
}

/// Keeps the uploaded audio as the "transformed" track.
///
/// Used when no style-transfer service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughStyleTransfer;

#[async_trait]
impl StyleTransfer for PassthroughStyleTransfer {
    async fn transform(
        &self,
        audio_url: &str,
        target_style: &str,
    ) -> Result<StyleTransferOutput, CollaboratorError> {
        tracing::debug!(audio_url, target_style, "Style transfer pass-through");
        Ok(StyleTransferOutput {
            transformed_audio_url: audio_url.to_string(),
        })
    }
}
