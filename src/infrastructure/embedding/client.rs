//! Failure-swallowing embedding client used by the cache paths

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{HttpClient, OpenAiEmbeddingProvider};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_cache_degraded;

/// Embedding configuration
#[derive(Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dimensions: default_dimensions(),
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Text to fixed-dimension vector, or `None` on any failure.
///
/// Without a provider every call returns `None`, which turns the semantic
/// cache into a no-op.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    model: String,
    dimensions: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: Some(provider),
            model: model.into(),
            dimensions,
        }
    }

    pub fn disabled(dimensions: usize) -> Self {
        Self {
            provider: None,
            model: String::new(),
            dimensions,
        }
    }

    /// Builds an OpenAI-backed client, or a disabled one when no key is configured
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        if config.api_key.trim().is_empty() {
            return Ok(Self::disabled(config.dimensions));
        }

        let http = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        let provider = match &config.base_url {
            Some(base_url) => OpenAiEmbeddingProvider::with_base_url(http, &config.api_key, base_url),
            None => OpenAiEmbeddingProvider::new(http, &config.api_key),
        };

        Ok(Self::new(Arc::new(provider), &config.model, config.dimensions))
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let provider = self.provider.as_ref()?;

        let request = EmbeddingRequest::new(&self.model, text).with_dimensions(self.dimensions);

        match provider.embed(request).await {
            Ok(response) if response.dimensions() == self.dimensions => {
                debug!(dimensions = self.dimensions, "Embedding computed");
                Some(response.into_vector())
            }
            Ok(response) => {
                warn!(
                    expected = self.dimensions,
                    actual = response.dimensions(),
                    "Embedding has unexpected dimensionality"
                );
                record_cache_degraded("embedding");
                None
            }
            Err(e) => {
                warn!(
                    provider = provider.provider_name(),
                    error = %e,
                    "Embedding failed"
                );
                record_cache_degraded("embedding");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;

    #[tokio::test]
    async fn test_returns_vector_of_expected_dimensions() {
        let client = EmbeddingClient::new(Arc::new(MockEmbeddingProvider::new(8)), "m", 8);

        let vector = client.embed("hello").await.unwrap();

        assert_eq!(vector.len(), 8);
    }

    #[tokio::test]
    async fn test_wrong_dimensions_is_none() {
        let client = EmbeddingClient::new(Arc::new(MockEmbeddingProvider::new(4)), "m", 8);

        assert!(client.embed("hello").await.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_is_none() {
        let provider = MockEmbeddingProvider::new(8).with_error("401 invalid key");
        let client = EmbeddingClient::new(Arc::new(provider), "m", 8);

        assert!(client.embed("hello").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_without_key() {
        let client = EmbeddingClient::from_config(&EmbeddingConfig::default()).unwrap();

        assert!(!client.is_enabled());
        assert!(client.embed("hello").await.is_none());
    }
}
