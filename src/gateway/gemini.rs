//! HTTP adapter for the Gemini generateContent API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::{GatewayError, ProviderError};

/// Maximum response body size we are willing to buffer (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for text completion providers, keyed by model identifier per call.
#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Gemini API adapter for single-prompt text generation.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create from an API key with default endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; its absence is a precondition failure
    /// surfaced here, before any request is attempted.
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GatewayError::config("GEMINI_API_KEY not set"))?;

        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

        let timeout = std::env::var("GEMINI_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self::with_config(api_key, base_url, timeout)
    }

    /// Create with custom configuration.
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let api_key = api_key.into();
        let base_url = base_url.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| GatewayError::config("invalid API key format"))?;
        headers.insert("x-goog-api-key", key_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| GatewayError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct GenerateApiRequest {
    contents: Vec<ApiContent>,
}

#[derive(Serialize)]
struct ApiContent {
    parts: Vec<ApiPart>,
}

#[derive(Serialize, Deserialize)]
struct ApiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateApiResponse {
    candidates: Option<Vec<ApiCandidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiCandidate {
    content: Option<ApiCandidateContent>,
}

#[derive(Deserialize)]
struct ApiCandidateContent {
    parts: Option<Vec<ApiPart>>,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

// =============================================================================
// TEXT PROVIDER IMPL
// =============================================================================

#[async_trait]
impl TextProvider for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let api_req = GenerateApiRequest {
            contents: vec![ApiContent {
                parts: vec![ApiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let mut response = self
            .client
            .post(self.generate_url(model))
            .json(&api_req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();

        // Stream the body to enforce the size limit.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(ProviderError::malformed(format!(
                    "response too large: {new_len} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).to_string();

        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<GenerateApiResponse>(&body) {
                if let Some(error) = parsed.error {
                    return Err(ProviderError::api(
                        error.code.unwrap_or(status.as_u16()),
                        error.status,
                        error.message.unwrap_or_default(),
                    ));
                }
            }
            return Err(ProviderError::api(
                status.as_u16(),
                None,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let parsed: GenerateApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(format!("invalid JSON: {e}")))?;

        // Some failures come back with HTTP 200 and an error object.
        if let Some(error) = parsed.error {
            return Err(ProviderError::api(
                error.code.unwrap_or(status.as_u16()),
                error.status,
                error.message.unwrap_or_default(),
            ));
        }

        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(text)
    }
}
