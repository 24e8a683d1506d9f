//! Database migrations infrastructure

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Applies versioned migrations tracked in a `_migrations` table
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration if it has not been applied yet.
    ///
    /// Returns whether the migration ran.
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin migration: {}", e)))?;

        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
                .bind(migration.version)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to check migration status: {}", e))
                })?;

        if applied {
            return Ok(false);
        }

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        Ok(true)
    }

    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// A forward-only schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: i64, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }
}

pub fn gateway_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create response_cache table",
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                id UUID PRIMARY KEY,
                feature_tag TEXT NOT NULL,
                prompt_hash CHAR(64) NOT NULL,
                prompt_normalized TEXT NOT NULL,
                embedding REAL[],
                response TEXT NOT NULL,
                model TEXT NOT NULL,
                input_tokens INTEGER NOT NULL DEFAULT 0,
                output_tokens INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL,
                hit_count BIGINT NOT NULL DEFAULT 0
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_response_cache_key
                ON response_cache (feature_tag, prompt_hash);
            CREATE INDEX IF NOT EXISTS idx_response_cache_recent
                ON response_cache (feature_tag, created_at DESC)
                WHERE embedding IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_response_cache_expires_at
                ON response_cache (expires_at);
            "#,
        ),
        Migration::new(
            2,
            "Create audit_log table",
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id UUID PRIMARY KEY,
                principal_id TEXT NOT NULL,
                principal_email TEXT,
                feature_tag TEXT NOT NULL,
                cache_hit BOOLEAN NOT NULL,
                cache_type TEXT NOT NULL,
                latency_ms BIGINT NOT NULL,
                input_tokens INTEGER,
                output_tokens INTEGER,
                outcome TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_log_principal
                ON audit_log (principal_id, created_at DESC);
            "#,
        ),
        Migration::new(
            3,
            "Create rate_limits table",
            r#"
            CREATE TABLE IF NOT EXISTS rate_limits (
                principal_id TEXT NOT NULL,
                action TEXT NOT NULL,
                window_start TIMESTAMPTZ NOT NULL,
                count INTEGER NOT NULL,
                PRIMARY KEY (principal_id, action)
            );
            "#,
        ),
    ]
}

/// Runs all pending gateway migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());
    migrator.ensure_migrations_table().await?;

    for migration in gateway_migrations() {
        if migrator.run_migration(&migration).await? {
            info!(
                version = migration.version,
                description = migration.description,
                "Applied migration"
            );
        }
    }

    let version = migrator.current_version().await?;
    info!(version = ?version, "Database schema up to date");

    Ok(())
}
