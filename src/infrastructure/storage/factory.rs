//! Runtime selection of store backends

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::migrations::run_migrations;
use super::postgres::PostgresConfig;
use crate::domain::audit::AuditRepository;
use crate::domain::cache::ResponseCacheRepository;
use crate::domain::rate_limit::{RateLimitConfig, RateLimiter};
use crate::domain::DomainError;
use crate::infrastructure::audit::{InMemoryAuditRepository, PostgresAuditRepository};
use crate::infrastructure::cache::{InMemoryResponseCache, PostgresResponseCache, DEFAULT_MAX_ENTRIES};
use crate::infrastructure::rate_limit::{InMemoryRateLimiter, PostgresRateLimiter};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[serde(alias = "in_memory", alias = "inmemory")]
    Memory,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type", default = "default_storage_type")]
    pub storage_type: StorageType,
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Bound on the in-memory response cache
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,
}

fn default_storage_type() -> StorageType {
    StorageType::Memory
}

fn default_memory_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: default_storage_type(),
            postgres: PostgresConfig::default(),
            memory_max_entries: default_memory_max_entries(),
        }
    }
}

/// The three stores the gateway persists to
#[derive(Clone)]
pub struct Stores {
    pub cache: Arc<dyn ResponseCacheRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl Stores {
    pub fn in_memory(rate_limit: RateLimitConfig, max_cache_entries: usize) -> Self {
        Self {
            cache: Arc::new(InMemoryResponseCache::with_capacity(max_cache_entries)),
            audit: Arc::new(InMemoryAuditRepository::default()),
            rate_limiter: Arc::new(InMemoryRateLimiter::new(rate_limit)),
        }
    }
}

/// Factory for creating store instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(
        config: &StorageConfig,
        rate_limit: RateLimitConfig,
    ) -> Result<Stores, DomainError> {
        match config.storage_type {
            StorageType::Memory => {
                info!(max_entries = config.memory_max_entries, "Using in-memory storage");
                Ok(Stores::in_memory(rate_limit, config.memory_max_entries))
            }
            StorageType::Postgres => {
                let pool = config.postgres.connect().await?;

                if config.postgres.run_migrations {
                    run_migrations(&pool).await?;
                }

                info!("Using PostgreSQL storage");
                Ok(Stores {
                    cache: Arc::new(PostgresResponseCache::new(pool.clone())),
                    audit: Arc::new(PostgresAuditRepository::new(pool.clone())),
                    rate_limiter: Arc::new(PostgresRateLimiter::new(pool, rate_limit)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_aliases() {
        for (raw, expected) in [
            ("memory", StorageType::Memory),
            ("in_memory", StorageType::Memory),
            ("postgres", StorageType::Postgres),
            ("pg", StorageType::Postgres),
        ] {
            let parsed: StorageType = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(parsed, expected);
        }
    }

    #[test]
    fn test_default_is_memory() {
        let config: StorageConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.storage_type, StorageType::Memory);
        assert_eq!(config.memory_max_entries, DEFAULT_MAX_ENTRIES);
    }

    #[tokio::test]
    async fn test_in_memory_stores_are_reachable() {
        let stores = StorageFactory::create(&StorageConfig::default(), RateLimitConfig::default())
            .await
            .unwrap();

        assert!(stores.cache.ping().await.is_ok());
        assert!(stores.audit.ping().await.is_ok());
        assert!(stores.rate_limiter.check("p", "gateway").await.unwrap().is_allowed());
    }
}
