use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::feature::{CacheableFeatures, FeatureTag, SystemPromptCatalog};
use crate::domain::gateway::GatewayLimits;
use crate::domain::rate_limit::RateLimitConfig;
use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::infrastructure::auth::AuthConfig;
use crate::infrastructure::embedding::EmbeddingConfig;
use crate::infrastructure::llm::LlmProviderConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::GatewayServiceConfig;
use crate::infrastructure::storage::StorageConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub auth: AuthConfig,
    pub gateway: GatewaySettings,
    pub cache: CacheSettings,
    pub semantic_cache: SemanticCacheConfig,
    pub rate_limit: RateLimitConfig,
    pub llm: LlmProviderConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Request limits and orchestration switches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    #[serde(flatten)]
    pub limits: GatewayLimits,
    pub request_timeout_secs: u64,
    pub coalesce_identical_requests: bool,
    pub cacheable_features: Vec<FeatureTag>,
    /// Per-tag system prompts replacing the built-in defaults
    pub system_prompts: BTreeMap<FeatureTag, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub retention_days: i64,
    pub background_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            limits: GatewayLimits::default(),
            request_timeout_secs: 60,
            coalesce_identical_requests: true,
            cacheable_features: FeatureTag::default_cacheable(),
            system_prompts: BTreeMap::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            retention_days: 7,
            background_queue_capacity: 1024,
        }
    }
}

impl LoggingConfig {
    pub fn to_logging(&self) -> logging::LoggingConfig {
        logging::LoggingConfig {
            level: self.level.clone(),
            format: self.format.clone(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Orchestrator settings assembled from the gateway, cache, semantic and auth sections
    pub fn gateway_service_config(&self) -> GatewayServiceConfig {
        GatewayServiceConfig {
            model: self.llm.model.clone(),
            limits: self.gateway.limits.clone(),
            cacheable: CacheableFeatures::new(self.gateway.cacheable_features.iter().copied()),
            prompts: self
                .gateway
                .system_prompts
                .iter()
                .fold(SystemPromptCatalog::new(), |catalog, (tag, prompt)| {
                    catalog.with_prompt(*tag, prompt.clone())
                }),
            semantic: self.semantic_cache.clone(),
            retention: chrono::Duration::days(self.cache.retention_days.max(1)),
            request_timeout: Duration::from_secs(self.gateway.request_timeout_secs.max(1)),
            coalesce_identical_requests: self.gateway.coalesce_identical_requests,
            allowed_roles: self.auth.allowed_roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::LlmProviderKind;
    use crate::infrastructure::storage::StorageType;

    fn from_toml(raw: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = from_toml("");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.gateway.limits.max_prompt_chars, 15_000);
        assert_eq!(config.gateway.request_timeout_secs, 60);
        assert_eq!(config.cache.retention_days, 7);
        assert_eq!(config.rate_limit.max_requests, 30);
        assert_eq!(config.storage.storage_type, StorageType::Memory);
        assert_eq!(config.llm.provider, LlmProviderKind::Anthropic);
        assert!(config.semantic_cache.enabled);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = from_toml(
            r#"
            [logging]
            format = "json"

            [gateway]
            max_prompt_chars = 500
            coalesce_identical_requests = false
            cacheable_features = ["drug_lookup"]

            [semantic_cache]
            similarity_threshold = 0.95

            [llm]
            provider = "openai"
            model = "gpt-4o"
            "#,
        );

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.gateway.limits.max_prompt_chars, 500);
        assert_eq!(config.gateway.limits.max_context_chars, 50_000);
        assert!(!config.gateway.coalesce_identical_requests);
        assert_eq!(config.gateway.cacheable_features, vec![FeatureTag::DrugLookup]);
        assert_eq!(config.semantic_cache.similarity_threshold, 0.95);
        assert_eq!(config.llm.provider, LlmProviderKind::OpenAi);
    }

    #[test]
    fn test_gateway_service_config_mapping() {
        let mut config = AppConfig::default();
        config.llm.model = "claude-haiku".to_string();
        config.cache.retention_days = 3;
        config.auth.allowed_roles = vec!["nurse".to_string()];
        config.gateway.cacheable_features = vec![FeatureTag::General];

        let service = config.gateway_service_config();

        assert_eq!(service.model, "claude-haiku");
        assert_eq!(service.retention, chrono::Duration::days(3));
        assert_eq!(service.allowed_roles, vec!["nurse".to_string()]);
        assert!(service.cacheable.contains(FeatureTag::General));
        assert!(!service.cacheable.contains(FeatureTag::DrugLookup));
        assert_eq!(service.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_configured_system_prompts_replace_defaults() {
        let config = from_toml(
            r#"
            [gateway.system_prompts]
            drug_lookup = "Answer from the hospital formulary only."
            "#,
        );

        let service = config.gateway_service_config();
        let builtin = SystemPromptCatalog::new();

        assert_eq!(
            service.prompts.resolve(FeatureTag::DrugLookup, None),
            "Answer from the hospital formulary only."
        );
        assert_eq!(
            service.prompts.resolve(FeatureTag::LabAnalysis, None),
            builtin.resolve(FeatureTag::LabAnalysis, None)
        );
        assert_eq!(
            service.prompts.resolve(FeatureTag::DrugLookup, Some("Be brief.")),
            "Be brief."
        );
    }
}
