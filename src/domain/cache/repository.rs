//! Response cache persistence contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::CacheEntry;
use crate::domain::feature::FeatureTag;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Store of cached responses, scoped by feature tag
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponseCacheRepository: Send + Sync {
    /// Point lookup on (feature tag, prompt hash)
    async fn find_exact(
        &self,
        feature_tag: FeatureTag,
        prompt_hash: &str,
    ) -> Result<Option<CacheEntry>, DomainError>;

    /// Most recent entries for a tag that carry an embedding, at most `limit`
    async fn find_candidates(
        &self,
        feature_tag: FeatureTag,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError>;

    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError>;

    /// Atomic increment at the store
    async fn increment_hit_count(&self, id: Uuid) -> Result<(), DomainError>;

    /// Deletes entries whose expiry is at or before `now`, returning how many
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;

    /// Cheap connectivity probe for readiness checks
    async fn ping(&self) -> Result<(), DomainError>;
}
