//! Language model access
//!
//! The LLM is an optional collaborator: routing, HyDE, agentic chunking and
//! answer generation all degrade when it is absent. A deployment with
//! `llm.provider = "disabled"` gets no client at all.

mod ollama;
mod openai;

pub use ollama::OllamaModel;
pub use openai::OpenAiChatModel;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A text-completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Shared handle to the configured language model
#[derive(Clone)]
pub struct LlmClient {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Build the configured client; `None` when the LLM is disabled
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let model: Arc<dyn LanguageModel> = match config.provider.as_str() {
            "disabled" => return Ok(None),
            "openai" => Arc::new(OpenAiChatModel::new(config)?),
            "gemini" => Arc::new(OpenAiChatModel::gemini(config)?),
            "ollama" => Arc::new(OllamaModel::new(config)?),
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown LLM provider '{}'",
                    other
                )))
            }
        };

        tracing::info!(provider = %config.provider, model = %model.model_name(), "LLM client configured");
        Ok(Some(Self::new(model, config.timeout())))
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Complete a prompt within the configured timeout.
    ///
    /// Every failure surfaces as `LlmUnavailable` or `LlmTimeout`.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.model.complete(prompt)).await;

        let outcome = match result {
            Err(_) => Err(AppError::LlmTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Ok(Err(e @ (AppError::LlmUnavailable { .. } | AppError::LlmTimeout { .. }))) => Err(e),
            Ok(Err(e)) => Err(AppError::LlmUnavailable {
                message: e.to_string(),
            }),
            Ok(Ok(text)) => Ok(text),
        };

        metrics::record_llm(
            start.elapsed().as_secs_f64(),
            self.model_name(),
            outcome.is_ok(),
        );

        if let Err(e) = &outcome {
            tracing::warn!(model = %self.model_name(), error = %e, "LLM completion failed");
        }

        outcome
    }
}

/// In-process model for tests and demos.
///
/// Replies from a script first, then with the fixed reply; with neither it fails.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<String>>>,
    reply: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Always answer with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::build(VecDeque::new(), Some(reply.into()))
    }

    /// Fail every call with `LlmUnavailable`
    pub fn failing() -> Self {
        Self::build(VecDeque::new(), None)
    }

    /// Answer the given replies in order, then fail
    pub fn scripted(replies: Vec<Result<String>>) -> Self {
        Self::build(replies.into(), None)
    }

    fn build(script: VecDeque<Result<String>>, reply: Option<String>) -> Self {
        Self {
            script: Mutex::new(script),
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match (scripted, &self.reply) {
            (Some(next), _) => next,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(AppError::LlmUnavailable {
                message: "mock model has no reply".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HangingModel;

    #[async_trait]
    impl LanguageModel for HangingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_disabled_provider_yields_no_client() {
        let config = LlmConfig {
            provider: "disabled".to_string(),
            ..LlmConfig::default()
        };
        assert!(LlmClient::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_configuration_error() {
        let config = LlmConfig {
            provider: "palm".to_string(),
            ..LlmConfig::default()
        };
        let err = LlmClient::from_config(&config).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_gemini_provider_configured() {
        let config = LlmConfig {
            provider: "gemini".to_string(),
            api_key: Some("key".to_string()),
            model: "gemini-2.0-flash".to_string(),
            ..LlmConfig::default()
        };
        let client = LlmClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.model_name(), "gemini-2.0-flash");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_llm_timeout() {
        let client = LlmClient::new(Arc::new(HangingModel), Duration::from_secs(2));
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, AppError::LlmTimeout { timeout_ms: 2000 }));
    }

    #[tokio::test]
    async fn test_backend_errors_become_unavailable() {
        let mock = MockLlm::scripted(vec![Err(AppError::Internal {
            message: "boom".to_string(),
        })]);
        let client = LlmClient::new(Arc::new(mock), Duration::from_secs(1));
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, AppError::LlmUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_mock_script_then_fail() {
        let mock = Arc::new(MockLlm::scripted(vec![Ok("first".to_string())]));
        let client = LlmClient::new(mock.clone(), Duration::from_secs(1));
        assert_eq!(client.complete("a").await.unwrap(), "first");
        assert!(client.complete("b").await.is_err());
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.prompts(), vec!["a".to_string(), "b".to_string()]);
    }
}
