//! Gateway orchestrator
//!
//! Sequences admission, validation, the two cache lookups, the model call,
//! cache persistence and auditing for one request.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use super::background::BackgroundQueue;
use super::single_flight::{Flight, SingleFlight};
use crate::domain::audit::{AuditEntry, AuditOutcome, AuditRepository, CacheType};
use crate::domain::cache::{CacheEntry, CacheKey, ResponseCacheRepository, TokenUsage};
use crate::domain::feature::{CacheableFeatures, SystemPromptCatalog};
use crate::domain::gateway::{GatewayLimits, GatewayRequest, GatewayResponse, ValidatedRequest};
use crate::domain::llm::{LlmProvider, LlmRequest, Message};
use crate::domain::principal::Principal;
use crate::domain::rate_limit::{RateLimitDecision, RateLimiter};
use crate::domain::redaction::redact_phi;
use crate::domain::semantic_cache::{find_best_match, SemanticCacheConfig};
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingClient;
use crate::infrastructure::observability::{
    record_cache_degraded, record_gateway_request, record_llm_request, record_rejection,
    LlmRequestMetricParams,
};

const GATEWAY_ACTION: &str = "gateway";
const AUDIT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct GatewayServiceConfig {
    pub model: String,
    pub limits: GatewayLimits,
    pub cacheable: CacheableFeatures,
    pub prompts: SystemPromptCatalog,
    pub semantic: SemanticCacheConfig,
    pub retention: chrono::Duration,
    pub request_timeout: Duration,
    pub coalesce_identical_requests: bool,
    /// Empty means any authenticated principal
    pub allowed_roles: Vec<String>,
}

impl Default for GatewayServiceConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            limits: GatewayLimits::default(),
            cacheable: CacheableFeatures::default(),
            prompts: SystemPromptCatalog::new(),
            semantic: SemanticCacheConfig::default(),
            retention: chrono::Duration::days(7),
            request_timeout: Duration::from_secs(60),
            coalesce_identical_requests: true,
            allowed_roles: Vec::new(),
        }
    }
}

impl GatewayServiceConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_semantic(mut self, semantic: SemanticCacheConfig) -> Self {
        self.semantic = semantic;
        self
    }

    pub fn with_allowed_roles(mut self, roles: Vec<String>) -> Self {
        self.allowed_roles = roles;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_identical_requests = enabled;
        self
    }
}

/// A model answer produced for this request
#[derive(Debug, Clone)]
struct Completion {
    response: String,
    model: String,
    usage: Option<TokenUsage>,
}

/// How the non-cached path was answered
enum Answer {
    Fresh(Completion),
    /// Borrowed from a concurrent identical request
    Shared(String),
}

pub struct GatewayService {
    rate_limiter: Arc<dyn RateLimiter>,
    cache: Arc<dyn ResponseCacheRepository>,
    audit: Arc<dyn AuditRepository>,
    llm: Arc<dyn LlmProvider>,
    embeddings: EmbeddingClient,
    background: BackgroundQueue,
    in_flight: SingleFlight<String>,
    config: GatewayServiceConfig,
}

impl fmt::Debug for GatewayService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayService")
            .field("llm", &self.llm)
            .field("embeddings", &self.embeddings)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GatewayService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rate_limiter: Arc<dyn RateLimiter>,
        cache: Arc<dyn ResponseCacheRepository>,
        audit: Arc<dyn AuditRepository>,
        llm: Arc<dyn LlmProvider>,
        embeddings: EmbeddingClient,
        background: BackgroundQueue,
        config: GatewayServiceConfig,
    ) -> Self {
        Self {
            rate_limiter,
            cache,
            audit,
            llm,
            embeddings,
            background,
            in_flight: SingleFlight::new(),
            config,
        }
    }

    pub fn background(&self) -> &BackgroundQueue {
        &self.background
    }

    /// Run one request through the pipeline.
    ///
    /// Rejections (auth, rate limit, validation) happen before any side
    /// effect and are not audited. Every admitted request writes exactly one
    /// audit entry. Lookups, embedding and the model call share the request
    /// deadline; the audit write gets its own short budget after it.
    pub async fn handle(
        &self,
        principal: Option<Principal>,
        request: GatewayRequest,
    ) -> Result<GatewayResponse, DomainError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.request_timeout;

        let principal = self.admit(principal).await?;
        let request = self.config.limits.validate(request).inspect_err(|_| {
            record_rejection("invalid_argument");
        })?;
        let tag = request.feature_tag;

        let resolved =
            match tokio::time::timeout_at(deadline, self.resolve(&principal, &request, deadline))
                .await
            {
                Ok(resolved) => resolved,
                Err(_) => {
                    warn!(
                        principal_id = %principal.id(),
                        feature_tag = %tag,
                        timeout_ms = self.config.request_timeout.as_millis() as u64,
                        "Request deadline exceeded"
                    );
                    Err(DomainError::internal("Request deadline exceeded"))
                }
            };

        let response = match resolved {
            Ok(response) => response,
            Err(_) => {
                let entry = AuditEntry::new(
                    &principal,
                    tag,
                    CacheType::None,
                    elapsed_ms(started),
                    AuditOutcome::Failed,
                );
                self.write_audit(entry).await;
                return Err(DomainError::internal("AI service unavailable"));
            }
        };

        let entry = AuditEntry::new(
            &principal,
            tag,
            response.cache_type,
            elapsed_ms(started),
            AuditOutcome::Success,
        )
        .with_token_usage(response.usage);
        self.write_audit(entry).await;

        record_gateway_request(tag.as_str(), response.cache_type.as_str());
        info!(
            principal_id = %principal.id(),
            feature_tag = %tag,
            cache_type = response.cache_type.as_str(),
            latency_ms = elapsed_ms(started),
            "Gateway request served"
        );

        Ok(response)
    }

    /// Cache lookups, then the model; runs under the request deadline
    async fn resolve(
        &self,
        principal: &Principal,
        request: &ValidatedRequest,
        deadline: tokio::time::Instant,
    ) -> Result<GatewayResponse, DomainError> {
        let tag = request.feature_tag;
        let cache_allowed = request.cache_allowed(&self.config.cacheable);
        let system_prompt = self
            .config
            .prompts
            .resolve(tag, request.system_instruction_override.as_deref());

        let redacted = redact_phi(&request.prompt);
        let key = CacheKey::compute(tag, &system_prompt, &redacted.text);

        debug!(
            principal_id = %principal.id(),
            feature_tag = %tag,
            prompt_hash = %key.fingerprint(),
            prompt_chars = request.prompt.chars().count(),
            has_context = request.context.is_some(),
            history_turns = request.history.len(),
            redaction_rules = redacted.rules_applied.len(),
            cache_allowed,
            "Gateway request admitted"
        );

        let mut embedding = None;

        if cache_allowed {
            if let Some(entry) = self.lookup_exact(&key).await {
                return Ok(self.serve_hit(entry, CacheType::Exact));
            }

            embedding = self.embed(&key).await;

            if let Some(query) = embedding.as_deref() {
                if let Some(entry) = self.lookup_semantic(&key, query).await {
                    return Ok(self.serve_hit(entry, CacheType::Semantic));
                }
            }
        }

        let answer = if cache_allowed && self.config.coalesce_identical_requests {
            self.answer_coalesced(&key, &system_prompt, request, deadline).await
        } else {
            self.complete(&system_prompt, request, deadline).await.map(Answer::Fresh)
        };

        let answer = answer.inspect_err(|e| {
            error!(
                principal_id = %principal.id(),
                feature_tag = %tag,
                prompt_hash = %key.fingerprint(),
                error = %e,
                "Model call failed"
            );
        })?;

        match answer {
            Answer::Fresh(completion) => {
                if cache_allowed {
                    let mut entry = CacheEntry::new(
                        &key,
                        &completion.response,
                        &completion.model,
                        completion.usage.unwrap_or_default(),
                        self.config.retention,
                    );
                    if let Some(embedding) = embedding {
                        entry = entry.with_embedding(embedding);
                    }
                    self.background.persist(entry);
                }
                Ok(GatewayResponse::fresh(completion.response, completion.usage))
            }
            Answer::Shared(response) => Ok(GatewayResponse::fresh(response, None)),
        }
    }

    async fn admit(&self, principal: Option<Principal>) -> Result<Principal, DomainError> {
        let Some(principal) = principal else {
            record_rejection("unauthenticated");
            return Err(DomainError::unauthenticated("Authentication required"));
        };

        if !principal.has_any_role(&self.config.allowed_roles) {
            record_rejection("permission_denied");
            return Err(DomainError::permission_denied(
                "Principal has no role permitted to use the gateway",
            ));
        }

        match self.rate_limiter.check(principal.id(), GATEWAY_ACTION).await? {
            RateLimitDecision::Allowed { .. } => Ok(principal),
            decision @ RateLimitDecision::Limited { .. } => {
                record_rejection("resource_exhausted");
                warn!(principal_id = %principal.id(), "Rate limit exceeded");
                Err(DomainError::rate_limited(decision.retry_after_secs().unwrap_or(1)))
            }
        }
    }

    async fn lookup_exact(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.cache.find_exact(key.feature_tag(), key.hash()).await {
            Ok(found) => found,
            Err(e) => {
                warn!(prompt_hash = %key.fingerprint(), error = %e, "Exact cache lookup failed");
                record_cache_degraded("exact_lookup");
                None
            }
        }
    }

    async fn embed(&self, key: &CacheKey) -> Option<Vec<f32>> {
        if !self.config.semantic.enabled || !self.embeddings.is_enabled() {
            return None;
        }

        self.embeddings.embed(key.normalized()).await
    }

    async fn lookup_semantic(&self, key: &CacheKey, query: &[f32]) -> Option<CacheEntry> {
        let candidates = match self
            .cache
            .find_candidates(key.feature_tag(), self.config.semantic.candidate_limit())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(prompt_hash = %key.fingerprint(), error = %e, "Semantic candidate fetch failed");
                record_cache_degraded("semantic_search");
                return None;
            }
        };

        let scanned = candidates.len();
        let found = find_best_match(
            query,
            candidates,
            self.embeddings.dimensions(),
            self.config.semantic.similarity_threshold,
        );

        match found {
            Some(m) => {
                debug!(
                    prompt_hash = %key.fingerprint(),
                    similarity = m.similarity,
                    scanned,
                    "Semantic cache hit"
                );
                Some(m.entry)
            }
            None => {
                debug!(prompt_hash = %key.fingerprint(), scanned, "Semantic cache miss");
                None
            }
        }
    }

    fn serve_hit(&self, entry: CacheEntry, cache_type: CacheType) -> GatewayResponse {
        self.background.increment_hit_count(entry.id);
        debug!(entry_id = %entry.id, cache_type = cache_type.as_str(), "Serving cached response");

        GatewayResponse::from_cache(entry.response, cache_type)
    }

    /// First caller for a key runs the model; concurrent callers wait on it
    async fn answer_coalesced(
        &self,
        key: &CacheKey,
        system_prompt: &str,
        request: &ValidatedRequest,
        deadline: tokio::time::Instant,
    ) -> Result<Answer, DomainError> {
        let flight_key = format!("{}:{}", key.feature_tag(), key.hash());

        match self.in_flight.join(flight_key) {
            Flight::Leader(guard) => {
                let completion = self.complete(system_prompt, request, deadline).await?;
                guard.complete(completion.response.clone());
                Ok(Answer::Fresh(completion))
            }
            Flight::Follower(mut rx) => {
                debug!(prompt_hash = %key.fingerprint(), "Joining in-flight request");

                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Ok(response)) => Ok(Answer::Shared(response)),
                    Ok(Err(RecvError::Closed | RecvError::Lagged(_))) => {
                        debug!(prompt_hash = %key.fingerprint(), "Leader failed, calling model directly");
                        self.complete(system_prompt, request, deadline).await.map(Answer::Fresh)
                    }
                    Err(_) => Err(DomainError::internal("Request deadline exceeded")),
                }
            }
        }
    }

    async fn complete(
        &self,
        system_prompt: &str,
        request: &ValidatedRequest,
        deadline: tokio::time::Instant,
    ) -> Result<Completion, DomainError> {
        let llm_request = build_llm_request(system_prompt, request);
        let model = self.config.model.as_str();
        let started = Instant::now();

        let result = match tokio::time::timeout_at(deadline, self.llm.chat(model, llm_request)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::provider(
                self.llm.provider_name(),
                "request deadline exceeded",
            )),
        };

        let usage = result
            .as_ref()
            .ok()
            .and_then(|r| r.usage.as_ref())
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        record_llm_request(LlmRequestMetricParams {
            provider: self.llm.provider_name(),
            model,
            duration: started.elapsed(),
            success: result.is_ok(),
            input_tokens: usage.map(|u| u64::from(u.input)),
            output_tokens: usage.map(|u| u64::from(u.output)),
        });

        let response = result?;

        Ok(Completion {
            response: response.content().to_string(),
            model: response.model,
            usage,
        })
    }

    async fn write_audit(&self, entry: AuditEntry) {
        let id = entry.id;

        match tokio::time::timeout(AUDIT_WRITE_TIMEOUT, self.audit.append(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(audit_id = %id, error = %e, "Audit write failed"),
            Err(_) => error!(
                audit_id = %id,
                timeout_ms = AUDIT_WRITE_TIMEOUT.as_millis() as u64,
                "Audit write timed out"
            ),
        }
    }
}

/// System prompt, capped history, then the current message with any context
/// placed ahead of the question
fn build_llm_request(system_prompt: &str, request: &ValidatedRequest) -> LlmRequest {
    let user_message = match &request.context {
        Some(context) => format!("Context:\n{}\n\nQuestion:\n{}", context, request.prompt),
        None => request.prompt.clone(),
    };

    LlmRequest::builder()
        .system(system_prompt)
        .messages(request.history.iter().cloned())
        .message(Message::user(user_message))
        .max_tokens(request.max_tokens)
        .build()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
