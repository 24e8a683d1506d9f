//! PostgreSQL response cache

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::cache::{CacheEntry, ResponseCacheRepository, TokenUsage};
use crate::domain::feature::FeatureTag;
use crate::domain::DomainError;
use crate::infrastructure::storage::storage_error;

const SELECT_COLUMNS: &str = "id, feature_tag, prompt_hash, prompt_normalized, embedding, \
    response, model, input_tokens, output_tokens, created_at, expires_at, hit_count";

#[derive(Debug, Clone)]
pub struct PostgresResponseCache {
    pool: PgPool,
}

impl PostgresResponseCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<CacheEntry, DomainError> {
    let map = storage_error("Failed to decode cache row");

    let feature_tag: String = row.try_get("feature_tag").map_err(&map)?;
    let input_tokens: i32 = row.try_get("input_tokens").map_err(&map)?;
    let output_tokens: i32 = row.try_get("output_tokens").map_err(&map)?;
    let hit_count: i64 = row.try_get("hit_count").map_err(&map)?;
    let prompt_hash: String = row.try_get("prompt_hash").map_err(&map)?;

    Ok(CacheEntry {
        id: row.try_get("id").map_err(&map)?,
        feature_tag: feature_tag.parse::<FeatureTag>()?,
        prompt_hash: prompt_hash.trim_end().to_string(),
        prompt_normalized: row.try_get("prompt_normalized").map_err(&map)?,
        embedding: row.try_get("embedding").map_err(&map)?,
        response: row.try_get("response").map_err(&map)?,
        model: row.try_get("model").map_err(&map)?,
        token_usage: TokenUsage::new(input_tokens.max(0) as u32, output_tokens.max(0) as u32),
        created_at: row.try_get("created_at").map_err(&map)?,
        expires_at: row.try_get("expires_at").map_err(&map)?,
        hit_count: hit_count.max(0) as u64,
    })
}

#[async_trait]
impl ResponseCacheRepository for PostgresResponseCache {
    async fn find_exact(
        &self,
        feature_tag: FeatureTag,
        prompt_hash: &str,
    ) -> Result<Option<CacheEntry>, DomainError> {
        let query = format!(
            "SELECT {} FROM response_cache WHERE feature_tag = $1 AND prompt_hash = $2 LIMIT 1",
            SELECT_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(feature_tag.as_str())
            .bind(prompt_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("Failed to look up cache entry"))?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_candidates(
        &self,
        feature_tag: FeatureTag,
        limit: usize,
    ) -> Result<Vec<CacheEntry>, DomainError> {
        let query = format!(
            "SELECT {} FROM response_cache \
             WHERE feature_tag = $1 AND embedding IS NOT NULL \
             ORDER BY created_at DESC LIMIT $2",
            SELECT_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(feature_tag.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("Failed to fetch semantic candidates"))?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO response_cache (
                id, feature_tag, prompt_hash, prompt_normalized, embedding, response, model,
                input_tokens, output_tokens, created_at, expires_at, hit_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (feature_tag, prompt_hash) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.feature_tag.as_str())
        .bind(&entry.prompt_hash)
        .bind(&entry.prompt_normalized)
        .bind(&entry.embedding)
        .bind(&entry.response)
        .bind(&entry.model)
        .bind(entry.token_usage.input as i32)
        .bind(entry.token_usage.output as i32)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .bind(entry.hit_count as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to insert cache entry"))?;

        Ok(())
    }

    async fn increment_hit_count(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query("UPDATE response_cache SET hit_count = hit_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to increment hit count"))?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM response_cache WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage_error("Failed to delete expired cache entries"))?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_error("Cache store unreachable"))?;

        Ok(())
    }
}
