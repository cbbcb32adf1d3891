//! Model gateway: ordered candidate fallback over a text provider.
//!
//! One logical completion request may try several candidate models. A failure
//! of any kind (structured API error, transport fault, timeout, blank payload)
//! is fatal only to that candidate; the gateway advances to the next one and
//! fails the whole call only when the roster is exhausted.

pub mod error;
pub mod gemini;

use async_trait::async_trait;

use gemini::TextProvider;

pub use error::{GatewayError, ModelAttempt, ProviderError};
pub use gemini::GeminiClient;

/// Default candidate roster: primary model first, then cheaper fallbacks.
const DEFAULT_CANDIDATES: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

/// Ordered, swappable list of candidate model identifiers.
///
/// Injected into both gateway call sites (query generation and insight) so
/// the fallback policy lives in exactly one configuration value.
#[derive(Debug, Clone)]
pub struct CandidateModels(Vec<String>);

impl CandidateModels {
    /// Build from an explicit ordered list. Empty input falls back to the
    /// default roster; an empty roster could never produce a completion.
    pub fn new(models: Vec<String>) -> Self {
        if models.is_empty() {
            Self::default()
        } else {
            Self(models)
        }
    }

    /// Default roster with the primary model optionally overridden by
    /// `ASSISTANT_PRIMARY_MODEL`.
    pub fn from_env() -> Self {
        let mut models: Vec<String> = DEFAULT_CANDIDATES.iter().map(|m| m.to_string()).collect();
        if let Ok(primary) = std::env::var("ASSISTANT_PRIMARY_MODEL") {
            if !primary.trim().is_empty() {
                models[0] = primary;
            }
        }
        Self(models)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn primary(&self) -> &str {
        &self.0[0]
    }
}

impl Default for CandidateModels {
    fn default() -> Self {
        Self(DEFAULT_CANDIDATES.iter().map(|m| m.to_string()).collect())
    }
}

/// A successful completion plus the identifier of the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

/// Caller-facing seam: one prompt in, one completion (with provenance) out.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Completion, GatewayError>;
}

/// Gateway that walks the candidate roster in order.
pub struct ModelGateway<P: TextProvider> {
    provider: P,
    candidates: CandidateModels,
}

impl ModelGateway<GeminiClient> {
    /// Build the production gateway from process configuration.
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self::new(GeminiClient::from_env()?, CandidateModels::from_env()))
    }
}

impl<P: TextProvider> ModelGateway<P> {
    pub fn new(provider: P, candidates: CandidateModels) -> Self {
        Self {
            provider,
            candidates,
        }
    }

    pub fn candidates(&self) -> &CandidateModels {
        &self.candidates
    }

    /// Try candidates strictly in roster order; return the first usable
    /// completion verbatim. Exhaustion carries every failed attempt and no
    /// partial text.
    pub async fn generate(&self, prompt: &str) -> Result<Completion, GatewayError> {
        let mut attempts = Vec::new();

        for model in self.candidates.iter() {
            match self.provider.generate(model, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    return Ok(Completion {
                        text,
                        model: model.to_string(),
                    });
                }
                Ok(_) => attempts.push(ModelAttempt {
                    model: model.to_string(),
                    error: ProviderError::Empty,
                }),
                Err(error) => attempts.push(ModelAttempt {
                    model: model.to_string(),
                    error,
                }),
            }
        }

        Err(GatewayError::Exhausted { attempts })
    }
}

#[async_trait]
impl<P: TextProvider> CompletionGateway for ModelGateway<P> {
    async fn generate(&self, prompt: &str) -> Result<Completion, GatewayError> {
        ModelGateway::generate(self, prompt).await
    }
}
