//! Domain layer - Core business logic and entities

pub mod audit;
pub mod cache;
pub mod embedding;
pub mod error;
pub mod feature;
pub mod gateway;
pub mod llm;
pub mod principal;
pub mod rate_limit;
pub mod redaction;
pub mod semantic_cache;

pub use audit::{AuditEntry, AuditOutcome, AuditRepository, CacheType};
pub use cache::{CacheEntry, CacheKey, ResponseCacheRepository, TokenUsage};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use error::DomainError;
pub use feature::{CacheableFeatures, FeatureTag, SystemPromptCatalog};
pub use gateway::{GatewayLimits, GatewayRequest, GatewayResponse, ValidatedRequest};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    Usage,
};
pub use principal::{Principal, PrincipalVerifier};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter, WindowState};
pub use semantic_cache::SemanticCacheConfig;
