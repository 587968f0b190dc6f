use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use trip_core::{Prompt, RawOutput};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation service returned no candidates: {0}")]
    EmptyResponse(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// External text generation capability.
///
/// Implementations ask for structured (JSON) output matching the prompt's
/// schema and make exactly one attempt per call.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<RawOutput>;
}
