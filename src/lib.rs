//! Clinical AI Gateway
//!
//! Authenticated, rate-limited access to a hosted LLM for ward applications:
//! - PHI redaction before anything is hashed, embedded or stored
//! - Exact and semantic response caching per feature tag
//! - Coalescing of identical in-flight requests
//! - An audit record for every answered request

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{info, warn};

use api::state::AppState;
use infrastructure::{
    auth::JwtPrincipalVerifier,
    embedding::EmbeddingClient,
    llm::LazyLlmProvider,
    services::{BackgroundQueue, GatewayService},
    storage::StorageFactory,
};

/// Everything the server needs, plus the background worker to spawn
pub struct GatewayApp {
    pub state: AppState,
    pub background: BackgroundQueue,
    /// Drains the background queue; exits once every queue handle is dropped
    pub worker: BoxFuture<'static, ()>,
}

impl std::fmt::Debug for GatewayApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayApp")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Wire stores, providers and the orchestrator from configuration
pub async fn create_app(config: &AppConfig) -> anyhow::Result<GatewayApp> {
    if config.auth.uses_default_secret() {
        warn!("Using the built-in JWT secret; set APP__AUTH__JWT_SECRET outside development");
    }

    let stores = StorageFactory::create(&config.storage, config.rate_limit.clone()).await?;
    let verifier = JwtPrincipalVerifier::new(&config.auth)?;
    let llm = LazyLlmProvider::new(config.llm.clone());

    let embeddings = if config.semantic_cache.enabled {
        EmbeddingClient::from_config(&config.embedding)?
    } else {
        EmbeddingClient::disabled(config.embedding.dimensions)
    };

    if config.semantic_cache.enabled && !embeddings.is_enabled() {
        warn!("No embedding API key configured; semantic cache lookups are disabled");
    }

    let (background, worker) = BackgroundQueue::new(
        stores.cache.clone(),
        embeddings.clone(),
        config.cache.background_queue_capacity,
    );

    let gateway = GatewayService::new(
        stores.rate_limiter,
        stores.cache.clone(),
        stores.audit.clone(),
        Arc::new(llm),
        embeddings,
        background.clone(),
        config.gateway_service_config(),
    );

    info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        semantic_cache = config.semantic_cache.enabled,
        "Gateway initialized"
    );

    Ok(GatewayApp {
        state: AppState {
            gateway: Arc::new(gateway),
            verifier: Arc::new(verifier),
            cache: stores.cache,
            audit: stores.audit,
        },
        background,
        worker: Box::pin(worker),
    })
}
