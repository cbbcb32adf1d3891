//! Error types for the model gateway.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single candidate model attempt.
///
/// Every variant is non-fatal to a gateway call: the gateway records the
/// attempt and moves on to the next candidate in the roster.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Structured error reported by the service (quota, unknown model,
    /// permission, ...).
    #[error("api error {status}{}: {message}", code_suffix(.code))]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service error status string (e.g. "RESOURCE_EXHAUSTED").
        code: Option<String>,
        message: String,
    },

    /// The service answered but the completion carried no text.
    #[error("empty completion")]
    Empty,

    /// The attempt exceeded the per-candidate request timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Transport-level fault (connection refused, TLS, DNS, ...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned a body we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Whether the service rejected the attempt for quota/rate reasons.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 429 || code.as_deref() == Some("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }

    /// Short error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Api { .. } => "api_error",
            Self::Empty => "empty_completion",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http_error",
            Self::Malformed(_) => "malformed_response",
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(c) => format!(" ({c})"),
        None => String::new(),
    }
}

/// One failed call to a candidate model, kept for diagnostics when the
/// whole gateway call exhausts.
#[derive(Debug)]
pub struct ModelAttempt {
    pub model: String,
    pub error: ProviderError,
}

impl std::fmt::Display for ModelAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.model, self.error)
    }
}

/// Failure of a whole gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or unusable credential. Raised before any network call.
    #[error("credential missing: {0}")]
    Config(String),

    /// Every candidate model failed. Carries the per-candidate attempts and
    /// never any partial completion text.
    #[error("all {} candidate models failed", .attempts.len())]
    Exhausted { attempts: Vec<ModelAttempt> },
}

impl GatewayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// One line per failed candidate, for user-facing failure causes.
    pub fn detail(&self) -> String {
        match self {
            Self::Config(msg) => msg.clone(),
            Self::Exhausted { attempts } => attempts
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_detection() {
        let err = ProviderError::api(429, None, "slow down");
        assert!(err.is_quota());

        let err = ProviderError::api(403, Some("RESOURCE_EXHAUSTED".into()), "quota");
        assert!(err.is_quota());

        let err = ProviderError::api(404, Some("NOT_FOUND".into()), "no such model");
        assert!(!err.is_quota());
    }

    #[test]
    fn exhausted_detail_lists_every_candidate() {
        let err = GatewayError::Exhausted {
            attempts: vec![
                ModelAttempt {
                    model: "alpha".into(),
                    error: ProviderError::api(429, Some("RESOURCE_EXHAUSTED".into()), "quota"),
                },
                ModelAttempt {
                    model: "beta".into(),
                    error: ProviderError::Empty,
                },
            ],
        };
        let detail = err.detail();
        assert!(detail.contains("alpha"));
        assert!(detail.contains("beta"));
        assert!(detail.contains("quota"));
    }
}
