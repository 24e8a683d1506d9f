//! Provider that is built on first use

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use super::factory::{LlmProviderConfig, LlmProviderFactory};
use crate::domain::{DomainError, LlmProvider, LlmRequest, LlmResponse};

/// Defers provider construction until the first chat call.
///
/// A construction failure is returned to that caller and retried on the next
/// call, so a missing key does not prevent the process from serving cache hits.
pub struct LazyLlmProvider {
    config: LlmProviderConfig,
    cell: OnceCell<Arc<dyn LlmProvider>>,
}

impl std::fmt::Debug for LazyLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLlmProvider")
            .field("provider", &self.config.provider)
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

impl LazyLlmProvider {
    pub fn new(config: LlmProviderConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Wraps an already constructed provider
    pub fn from_provider(config: LlmProviderConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            config,
            cell: OnceCell::new_with(Some(provider)),
        }
    }

    async fn provider(&self) -> Result<&Arc<dyn LlmProvider>, DomainError> {
        self.cell
            .get_or_try_init(|| async {
                let provider = LlmProviderFactory::create(&self.config)?;
                info!(
                    provider = provider.provider_name(),
                    model = %self.config.model,
                    "LLM provider initialized"
                );
                Ok(provider)
            })
            .await
    }
}

#[async_trait]
impl LlmProvider for LazyLlmProvider {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        self.provider().await?.chat(model, request).await
    }

    fn provider_name(&self) -> &'static str {
        match self.cell.get() {
            Some(provider) => provider.provider_name(),
            None => "lazy",
        }
    }
}
