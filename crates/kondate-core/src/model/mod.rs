//! Generative-model adapters.
//!
//! The pipeline sees a model as `generate(prompt) -> raw text`. The text is
//! expected, but not trusted, to be the plan JSON; see
//! [`crate::plan::normalize`].

mod fake;
mod gemini;

pub use fake::FakeModel;
pub use gemini::GeminiModel;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Default model name for the Gemini provider.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Error type for model invocations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("model not configured: {0}")]
    NotConfigured(String),
}

/// A text-generation backend.
#[async_trait]
pub trait PlanModel: Send + Sync + fmt::Debug {
    /// Send one prompt and return the model's raw text reply.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Provider name (e.g. "gemini", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name (e.g. "gemini-2.0-flash").
    fn model_name(&self) -> &str;
}

// Compile-time assertion: PlanModel must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanModel) {}
};

/// Which adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Gemini,
    /// Offline canned responses.
    Fake,
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "gemini",
            Self::Fake => "fake",
        })
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(Self::Gemini),
            "fake" => Ok(Self::Fake),
            other => Err(ModelError::NotConfigured(format!(
                "unknown provider {other:?} (expected gemini or fake)"
            ))),
        }
    }
}

/// Resolved model settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub api_key: Option<String>,
}

/// Construct the configured adapter.
pub fn create_model(config: &ModelConfig) -> Result<Box<dyn PlanModel>, ModelError> {
    match config.provider {
        ModelProvider::Fake => Ok(Box::new(FakeModel::default())),
        ModelProvider::Gemini => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ModelError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;
            Ok(Box::new(GeminiModel::new(api_key, config.model.clone())))
        }
    }
}
