//! PostgreSQL audit log

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::domain::audit::{AuditEntry, AuditRepository};
use crate::domain::DomainError;
use crate::infrastructure::storage::storage_error;

#[derive(Debug, Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        let (input_tokens, output_tokens) = match entry.token_usage {
            Some(usage) => (Some(usage.input as i32), Some(usage.output as i32)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, principal_id, principal_email, feature_tag, cache_hit, cache_type,
                latency_ms, input_tokens, output_tokens, outcome, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.principal_id)
        .bind(&entry.principal_email)
        .bind(entry.feature_tag.as_str())
        .bind(entry.cache_hit)
        .bind(entry.cache_type.as_str())
        .bind(entry.latency_ms as i64)
        .bind(input_tokens)
        .bind(output_tokens)
        .bind(entry.outcome.as_str())
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(storage_error("Failed to append audit entry"))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_error("Audit store unreachable"))?;

        Ok(())
    }
}
