//! Completion service abstraction
//!
//! A single chat-completion provider behind a trait so the assistant can be
//! driven by mocks in tests.

mod error;
mod openai;
mod types;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion providers
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Provider configuration read from the environment
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible gateway (e.g. `http://localhost:4000`)
    pub gateway: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
        }
    }

    /// Build the provider for `model`, or `None` without credentials.
    ///
    /// Gateway mode does not need a key; the gateway authenticates.
    pub fn build_service(&self, model: &str) -> Option<Arc<dyn CompletionService>> {
        let api_key = match (&self.openai_api_key, &self.gateway) {
            (Some(key), _) => key.clone(),
            (None, Some(_)) => "implicit".to_string(),
            (None, None) => return None,
        };
        match OpenAIService::new(api_key, model, self.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create completion client");
                None
            }
        }
    }
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    total_tokens = response.usage.total(),
                    "Completion request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    status = ?e.status,
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::assistant::testing::MockCompletionService;

    #[test]
    fn test_no_credentials_no_service() {
        assert!(LlmConfig::default().build_service("gpt-4o-mini").is_none());
    }

    #[test]
    fn test_api_key_builds_service() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            gateway: None,
        };
        let service = config.build_service("gpt-4o-mini").unwrap();
        assert_eq!(service.model_id(), "gpt-4o-mini");
    }

    #[test]
    fn test_gateway_without_key_builds_service() {
        let config = LlmConfig {
            openai_api_key: None,
            gateway: Some("https://gateway.example.com".to_string()),
        };
        assert!(config.build_service("gpt-4o").is_some());
    }

    #[tokio::test]
    async fn test_logging_service_passes_through() {
        let mock = Arc::new(MockCompletionService::new());
        mock.queue_text("bonjour");
        mock.queue_error(LlmError::rate_limit("slow down").with_status(429));
        let service = LoggingService::new(mock.clone());
        let request = CompletionRequest::new(vec![Message::user("salut")], 0.3);

        assert_eq!(service.complete(&request).await.unwrap().text, "bonjour");
        let err = service.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.status, Some(429));
        assert_eq!(mock.recorded_requests().len(), 2);
        assert_eq!(service.model_id(), "mock-model");
    }
}
