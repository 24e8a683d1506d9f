use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::http_client::HttpClient;
use super::{AnthropicProvider, OpenAiProvider};
use crate::domain::{DomainError, LlmProvider};

/// Supported chat providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderKind {
    Anthropic,
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
}

/// LLM provider configuration
#[derive(Clone, Deserialize)]
pub struct LlmProviderConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> LlmProviderKind {
    LlmProviderKind::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_timeout_secs() -> u64 {
    55
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create(config: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        if config.api_key.trim().is_empty() {
            return Err(DomainError::configuration(format!(
                "No API key configured for LLM provider {:?}",
                config.provider
            )));
        }

        let http_client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;

        let provider: Arc<dyn LlmProvider> = match (config.provider, &config.base_url) {
            (LlmProviderKind::Anthropic, Some(base_url)) => Arc::new(
                AnthropicProvider::with_base_url(http_client, &config.api_key, base_url),
            ),
            (LlmProviderKind::Anthropic, None) => {
                Arc::new(AnthropicProvider::new(http_client, &config.api_key))
            }
            (LlmProviderKind::OpenAi, Some(base_url)) => Arc::new(OpenAiProvider::with_base_url(
                http_client,
                &config.api_key,
                base_url,
            )),
            (LlmProviderKind::OpenAi, None) => {
                Arc::new(OpenAiProvider::new(http_client, &config.api_key))
            }
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProviderKind) -> LlmProviderConfig {
        LlmProviderConfig {
            provider,
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_anthropic_provider() {
        let provider = LlmProviderFactory::create(&config(LlmProviderKind::Anthropic)).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_create_openai_provider_with_base_url() {
        let config = LlmProviderConfig {
            base_url: Some("http://localhost:9000".to_string()),
            ..config(LlmProviderKind::OpenAi)
        };

        let provider = LlmProviderFactory::create(&config).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let result = LlmProviderFactory::create(&LlmProviderConfig::default());
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_config_deserializes_provider_names() {
        let parsed: LlmProviderConfig =
            serde_json::from_value(serde_json::json!({"provider": "openai", "api_key": "k"}))
                .unwrap();
        assert_eq!(parsed.provider, LlmProviderKind::OpenAi);
        assert_eq!(parsed.timeout_secs, 55);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let debug = format!("{:?}", config(LlmProviderKind::Anthropic));
        assert!(!debug.contains("test-key"));
    }
}
