//! Google Gemini provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use trip_core::{Prompt, RawOutput};

use crate::protocol::gemini::{GeminiRequest, GeminiResponse};
use crate::provider::{GenerationClient, LLMError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// The key travels in this header, never in the URL, so it cannot end up in
/// error messages that quote the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini API provider, non-streaming `generateContent`.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Option<Duration>,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Bound every call; expiry surfaces as `LLMError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn map_send_error(&self, err: reqwest::Error) -> LLMError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => LLMError::Timeout(timeout),
            _ => LLMError::Http(err.without_url()),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<RawOutput> {
        let request = GeminiRequest::structured(prompt);

        log::debug!(
            "Gemini generateContent: model='{}', kind='{}', prompt_chars={}",
            self.model,
            prompt.kind(),
            prompt.text().len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(|e| self.map_send_error(e))?;

            if status == 401 || status == 403 {
                return Err(LLMError::Auth(format!(
                    "Gemini authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(LLMError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let parsed: GeminiResponse = serde_json::from_slice(&body)?;

        if parsed.candidates.is_empty() {
            let reason = parsed
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(|reason| reason.as_str())
                .unwrap_or("no reason given")
                .to_string();
            return Err(LLMError::EmptyResponse(reason));
        }

        Ok(RawOutput::from_fragments(parsed.text_fragments()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_provider() {
        let provider = GeminiProvider::new("test_key");
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.model, "gemini-1.5-flash");
        assert!(provider.timeout.is_none());
    }

    #[test]
    fn test_chained_builders() {
        let provider = GeminiProvider::new("test_key")
            .with_base_url("https://custom.api.com/")
            .with_model("gemini-ultra")
            .with_timeout(Duration::from_secs(5))
            .unwrap();

        assert_eq!(provider.base_url, "https://custom.api.com");
        assert_eq!(provider.model(), "gemini-ultra");
        assert_eq!(provider.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_url_construction() {
        let provider = GeminiProvider::new("my_api_key_123")
            .with_base_url("https://test.api.com/v1beta")
            .with_model("gemini-custom");

        assert_eq!(
            provider.endpoint(),
            "https://test.api.com/v1beta/models/gemini-custom:generateContent"
        );
        assert!(!provider.endpoint().contains("my_api_key_123"));
    }
}
