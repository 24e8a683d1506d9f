//! Audit record entities

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cache::TokenUsage;
use crate::domain::feature::FeatureTag;
use crate::domain::principal::Principal;

/// Which cache path served a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    Exact,
    Semantic,
    None,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::None => "none",
        }
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the admitted request produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// One immutable record per admitted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub principal_id: String,
    pub principal_email: Option<String>,
    pub feature_tag: FeatureTag,
    pub cache_hit: bool,
    pub cache_type: CacheType,
    pub latency_ms: u64,
    pub token_usage: Option<TokenUsage>,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        principal: &Principal,
        feature_tag: FeatureTag,
        cache_type: CacheType,
        latency_ms: u64,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal_id: principal.id().to_string(),
            principal_email: principal.email().map(str::to_string),
            feature_tag,
            cache_hit: cache_type.is_hit(),
            cache_type,
            latency_ms,
            token_usage: None,
            outcome,
            timestamp: Utc::now(),
        }
    }

    pub fn with_token_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.token_usage = usage;
        self
    }
}
