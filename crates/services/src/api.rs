//! Shared JSON-over-HTTP client for collaborator services.
//!
//! Wraps [`reqwest`] with bearer authentication, status checking and
//! response decoding. Errors convert into [`CollaboratorError`] so the
//! pipeline treats every transport or API failure as retryable.

use lyricflow_pipeline::CollaboratorError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Where a collaborator service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Base HTTP URL, e.g. `https://api.example.com`. A trailing slash is
    /// ignored.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <key>` when present.
    pub api_key: Option<String>,
}

impl ServiceEndpoint {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Join `path` (starting with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Errors from the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Status {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl From<ApiError> for CollaboratorError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Request(e) if e.is_decode() => {
                CollaboratorError::InvalidResponse(e.to_string())
            }
            ApiError::Request(e) => CollaboratorError::Transport(e.to_string()),
            ApiError::Status { status, body } => CollaboratorError::Api { status, body },
        }
    }
}

/// HTTP client for one collaborator service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: reqwest::Client,
    endpoint: ServiceEndpoint,
}

impl ServiceClient {
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, endpoint: ServiceEndpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// `POST {base}{path}` with a JSON body, decoding a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint.url(path)).json(body);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`ApiError::Status`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn url_joins_without_double_slash() {
        let endpoint = ServiceEndpoint::new("https://api.example.com/", None);
        assert_eq!(
            endpoint.url("/v1/genre-swap"),
            "https://api.example.com/v1/genre-swap"
        );
    }

    #[test]
    fn status_error_maps_to_api_collaborator_error() {
        let err = CollaboratorError::from(ApiError::Status {
            status: 429,
            body: "slow down".to_string(),
        });
        assert_matches!(err, CollaboratorError::Api { status: 429, .. });
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Port 1 on loopback refuses connections.
        let client = ServiceClient::new(ServiceEndpoint::new("http://127.0.0.1:1", None));
        let err = client
            .post_json::<_, serde_json::Value>("/v1/ping", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_matches!(
            CollaboratorError::from(err),
            CollaboratorError::Transport(_)
        );
    }
}
