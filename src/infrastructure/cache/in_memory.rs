//! In-memory response cache

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::cache::{CacheEntry, ResponseCacheRepository};
use crate::domain::feature::FeatureTag;
use crate::domain::DomainError;

/// Entry bound used by `new`
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<Uuid, CacheEntry>,
    by_key: HashMap<(FeatureTag, String), Uuid>,
}

impl Entries {
    fn evict_oldest(&mut self) {
        let oldest = self
            .by_id
            .values()
            .min_by_key(|e| e.created_at)
            .map(|e| (e.id, e.feature_tag, e.prompt_hash.clone()));

        if let Some((id, tag, hash)) = oldest {
            self.by_id.remove(&id);
            self.by_key.remove(&(tag, hash));
        }
    }
}

/// Process-local cache for development and tests.
///
/// Holds at most `max_entries`; inserting past the bound evicts the oldest
/// entry by creation time.
#[derive(Debug)]
pub struct InMemoryResponseCache {
    entries: RwLock<Entries>,
    max_entries: usize,
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of one entry, for assertions
    pub fn get(&self, id: Uuid) -> Option<CacheEntry> {
        self.entries.read().ok()?.by_id.get(&id).cloned()
    }
}

#[async_trait]
impl ResponseCacheRepository for InMemoryResponseCache {
    async fn find_exact(
        &self,
        feature_tag: FeatureTag,
        prompt_hash: &str,
    ) -> Result<Option<CacheEntry>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries
            .by_key
            .get(&(feature_tag, prompt_hash.to_string()))
            .and_then(|id| entries.by_id.get(id))
            .cloned())
    }

    async fn find_candidates(
        &self,
        feature_tag: FeatureTag,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut candidates: Vec<CacheEntry> = entries
            .by_id
            .values()
            .filter(|e| e.feature_tag == feature_tag && e.embedding.is_some())
            .cloned()
            .collect();

        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        candidates.truncate(limit);

        Ok(candidates)
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let key = (entry.feature_tag, entry.prompt_hash.clone());
        if entries.by_key.contains_key(&key) {
            return Ok(());
        }

        while entries.by_id.len() >= self.max_entries {
            entries.evict_oldest();
        }

        entries.by_key.insert(key, entry.id);
        entries.by_id.insert(entry.id, entry);

        Ok(())
    }

    async fn increment_hit_count(&self, id: Uuid) -> Result<(), DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(entry) = entries.by_id.get_mut(&id) {
            entry.hit_count += 1;
        }

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let expired: Vec<(Uuid, FeatureTag, String)> = entries
            .by_id
            .values()
            .filter(|e| e.is_expired_at(now))
            .map(|e| (e.id, e.feature_tag, e.prompt_hash.clone()))
            .collect();

        for (id, tag, hash) in &expired {
            entries.by_id.remove(id);
            entries.by_key.remove(&(*tag, hash.clone()));
        }

        Ok(expired.len() as u64)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.entries
            .read()
            .map(|_| ())
            .map_err(|e| DomainError::internal(format!("Cache lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheKey, TokenUsage};
    use chrono::Duration;

    fn entry(tag: FeatureTag, prompt: &str) -> CacheEntry {
        let key = CacheKey::compute(tag, "system", prompt);
        CacheEntry::new(&key, format!("answer to {}", prompt), "m", TokenUsage::new(1, 1), Duration::days(7))
    }

    #[tokio::test]
    async fn test_exact_lookup_scoped_by_tag() {
        let cache = InMemoryResponseCache::new();
        let stored = entry(FeatureTag::DrugLookup, "metformin");
        let hash = stored.prompt_hash.clone();
        cache.insert(stored).await.unwrap();

        assert!(cache.find_exact(FeatureTag::DrugLookup, &hash).await.unwrap().is_some());
        assert!(cache.find_exact(FeatureTag::DrugInteraction, &hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_insert_wins_on_duplicate_key() {
        let cache = InMemoryResponseCache::new();
        let first = entry(FeatureTag::DrugLookup, "metformin");
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.response = "other".into();

        cache.insert(first.clone()).await.unwrap();
        cache.insert(second).await.unwrap();

        let found = cache
            .find_exact(FeatureTag::DrugLookup, &first.prompt_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_past_capacity_evicts_oldest() {
        let cache = InMemoryResponseCache::with_capacity(2);
        let base = Utc::now();

        let mut inserted = Vec::new();
        for (i, prompt) in ["a", "b", "c"].iter().enumerate() {
            let e = entry(FeatureTag::DrugLookup, prompt)
                .with_created_at(base + Duration::seconds(i as i64), Duration::days(7));
            inserted.push(e.clone());
            cache.insert(e).await.unwrap();
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(inserted[0].id).is_none());
        assert!(cache
            .find_exact(FeatureTag::DrugLookup, &inserted[0].prompt_hash)
            .await
            .unwrap()
            .is_none());
        assert!(cache.get(inserted[1].id).is_some());
        assert!(cache.get(inserted[2].id).is_some());
    }

    #[tokio::test]
    async fn test_candidates_most_recent_first_with_embedding_only() {
        let cache = InMemoryResponseCache::new();
        let base = Utc::now();

        for (i, prompt) in ["a", "b", "c"].iter().enumerate() {
            let e = entry(FeatureTag::ClinicalGuidelines, prompt)
                .with_embedding(vec![1.0, 0.0])
                .with_created_at(base + Duration::seconds(i as i64), Duration::days(7));
            cache.insert(e).await.unwrap();
        }
        cache.insert(entry(FeatureTag::ClinicalGuidelines, "no-vector")).await.unwrap();
        cache
            .insert(entry(FeatureTag::DrugLookup, "other-tag").with_embedding(vec![1.0, 0.0]))
            .await
            .unwrap();

        let candidates = cache
            .find_candidates(FeatureTag::ClinicalGuidelines, 2)
            .await
            .unwrap();

        let responses: Vec<&str> = candidates.iter().map(|c| c.response.as_str()).collect();
        assert_eq!(responses, vec!["answer to c", "answer to b"]);
    }

    #[tokio::test]
    async fn test_increment_and_delete_expired() {
        let cache = InMemoryResponseCache::new();
        let live = entry(FeatureTag::DrugLookup, "live");
        let stale = entry(FeatureTag::DrugLookup, "stale")
            .with_created_at(Utc::now() - Duration::days(10), Duration::days(7));
        let live_id = live.id;
        cache.insert(live).await.unwrap();
        cache.insert(stale).await.unwrap();

        cache.increment_hit_count(live_id).await.unwrap();
        cache.increment_hit_count(live_id).await.unwrap();
        cache.increment_hit_count(Uuid::new_v4()).await.unwrap();
        assert_eq!(cache.get(live_id).unwrap().hit_count, 2);

        assert_eq!(cache.delete_expired(Utc::now()).await.unwrap(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.ping().await.is_ok());
    }
}
