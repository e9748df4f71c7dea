//! LLM Client abstractions and provider management

use crate::types::{AppError, Result};
use crate::utils::toml_config::{LlmConfig, LlmProviderKind};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Await a model call, giving up once `limit` elapses.
///
/// Expiry maps to [`AppError::Timeout`]; `None` waits indefinitely.
pub async fn with_timeout<F>(call: F, limit: Option<Duration>) -> Result<String>
where
    F: Future<Output = Result<String>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(AppError::Timeout(format!(
                "no response within {}s",
                limit.as_secs()
            )))
        }),
        None => call.await,
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini via the OpenAI-compatible endpoint
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "...".to_string(),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
    ///     model: "gemini-2.5-flash".to_string(),
    ///     temperature: Some(0.4),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        temperature: Option<f32>,
    },

    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: Option<f32>,
    },
}

impl Provider {
    /// Build a provider from the `[llm]` config section and a resolved API key
    pub fn from_config(config: &LlmConfig, api_key: String) -> Self {
        let api_base = config.api_base().to_string();
        let model = config.model.clone();
        let temperature = config.temperature;

        match config.provider {
            LlmProviderKind::Gemini => Provider::Gemini {
                api_key,
                api_base,
                model,
                temperature,
            },
            LlmProviderKind::OpenAI => Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
            },
        }
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                temperature,
            }
            | Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
            } => Ok(Arc::new(
                super::openai::OpenAIClient::new(api_key.clone(), api_base.clone(), model.clone())
                    .with_temperature(*temperature),
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } | Provider::OpenAI { model, .. } => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_config() {
        let config = LlmConfig::default();
        let provider = Provider::from_config(&config, "key".to_string());

        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), "gemini-2.5-flash");
        match provider {
            Provider::Gemini {
                api_key,
                temperature,
                ..
            } => {
                assert_eq!(api_key, "key");
                assert_eq!(temperature, Some(0.4));
            }
            _ => panic!("Expected Gemini provider"),
        }
    }

    #[test]
    fn test_openai_provider_name() {
        let config = LlmConfig {
            provider: LlmProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            ..LlmConfig::default()
        };
        let provider = Provider::from_config(&config, String::new());
        assert_eq!(provider.name(), "OpenAI");
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("late".to_string())
        };
        let err = with_timeout(slow, Some(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(ref m) if m == "no response within 5s"));

        let fast = async { Ok("ok".to_string()) };
        assert_eq!(with_timeout(fast, None).await.unwrap(), "ok");
    }

    #[test]
    fn test_create_client_reports_model() {
        let provider = Provider::OpenAI {
            api_key: "test".to_string(),
            api_base: "http://localhost:9".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: None,
        };

        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }
}
