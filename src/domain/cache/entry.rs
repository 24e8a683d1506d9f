use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CacheKey;
use crate::domain::feature::FeatureTag;

/// Input/output token counts reported by the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

impl TokenUsage {
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u32 {
        self.input + self.output
    }
}

/// A cached model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: Uuid,
    pub feature_tag: FeatureTag,
    pub prompt_hash: String,
    pub prompt_normalized: String,
    pub embedding: Option<Vec<f32>>,
    pub response: String,
    pub model: String,
    pub token_usage: TokenUsage,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn new(
        key: &CacheKey,
        response: impl Into<String>,
        model: impl Into<String>,
        token_usage: TokenUsage,
        retention: Duration,
    ) -> Self {
        let created_at = Utc::now();

        Self {
            id: Uuid::new_v4(),
            feature_tag: key.feature_tag(),
            prompt_hash: key.hash().to_string(),
            prompt_normalized: key.normalized().to_string(),
            embedding: None,
            response: response.into(),
            model: model.into(),
            token_usage,
            created_at,
            expires_at: created_at + retention,
            hit_count: 0,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>, retention: Duration) -> Self {
        self.created_at = created_at;
        self.expires_at = created_at + retention;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
