//! Reap command - deletes expired cache entries once and exits

use chrono::Utc;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::cache::ResponseCacheRepository;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::StorageFactory;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging.to_logging());

    let stores = StorageFactory::create(&config.storage, config.rate_limit.clone()).await?;
    let removed = reap(stores.cache.as_ref()).await?;

    println!("Removed {} expired cache entries", removed);

    Ok(())
}

async fn reap(cache: &dyn ResponseCacheRepository) -> anyhow::Result<u64> {
    let now = Utc::now();
    let removed = cache.delete_expired(now).await?;

    info!(removed, cutoff = %now, "Expired cache entries reaped");

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheEntry, CacheKey, TokenUsage};
    use crate::domain::feature::FeatureTag;
    use crate::infrastructure::cache::InMemoryResponseCache;

    #[tokio::test]
    async fn test_reap_removes_only_expired() {
        let cache = InMemoryResponseCache::new();

        let key = CacheKey::compute(FeatureTag::DrugLookup, "sys", "old");
        let mut expired =
            CacheEntry::new(&key, "a", "m", TokenUsage::new(1, 1), chrono::Duration::days(7));
        expired.expires_at = Utc::now() - chrono::Duration::hours(1);
        cache.insert(expired).await.unwrap();

        let key = CacheKey::compute(FeatureTag::DrugLookup, "sys", "fresh");
        cache
            .insert(CacheEntry::new(&key, "b", "m", TokenUsage::new(1, 1), chrono::Duration::days(7)))
            .await
            .unwrap();

        assert_eq!(reap(&cache).await.unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }
}
