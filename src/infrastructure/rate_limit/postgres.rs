//! PostgreSQL fixed-window rate limiter

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

use crate::domain::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter, WindowState};
use crate::domain::DomainError;
use crate::infrastructure::storage::storage_error;

/// Attempts per check when Postgres aborts the transaction as a
/// serialization failure or deadlock
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Shares windows across gateway replicas.
///
/// Each check is one SERIALIZABLE transaction that locks the key's row with
/// `SELECT ... FOR UPDATE` before writing the advanced window back. Two
/// replicas inserting a first row for the same key can still conflict; the
/// loser is retried a bounded number of times.
#[derive(Debug, Clone)]
pub struct PostgresRateLimiter {
    pool: PgPool,
    config: RateLimitConfig,
}

impl PostgresRateLimiter {
    pub fn new(pool: PgPool, config: RateLimitConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl RateLimiter for PostgresRateLimiter {
    async fn check(&self, principal_id: &str, action: &str) -> Result<RateLimitDecision, DomainError> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::Allowed {
                remaining: self.config.max_requests,
            });
        }

        with_serialization_retry(|| self.try_check(principal_id, action))
            .await
            .map_err(storage_error("Rate limit check failed"))
    }
}

impl PostgresRateLimiter {
    async fn try_check(&self, principal_id: &str, action: &str) -> Result<RateLimitDecision, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            "SELECT window_start, count FROM rate_limits \
             WHERE principal_id = $1 AND action = $2 FOR UPDATE",
        )
        .bind(principal_id)
        .bind(action)
        .fetch_optional(&mut *tx)
        .await?;

        let current = match row {
            Some(row) => {
                let window_start: DateTime<Utc> = row.try_get("window_start")?;
                let count: i32 = row.try_get("count")?;
                Some(WindowState {
                    window_start,
                    count: count.max(0) as u32,
                })
            }
            None => None,
        };

        let (next, decision) = WindowState::advance(current, Utc::now(), &self.config);

        if current != Some(next) {
            sqlx::query(
                r#"
                INSERT INTO rate_limits (principal_id, action, window_start, count)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (principal_id, action)
                DO UPDATE SET window_start = EXCLUDED.window_start, count = EXCLUDED.count
                "#,
            )
            .bind(principal_id)
            .bind(action)
            .bind(next.window_start)
            .bind(next.count as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(decision)
    }
}

fn is_serialization_failure(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
}

async fn with_serialization_retry<T, F, Fut>(mut op: F) -> Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Err(e) if attempt < MAX_ATTEMPTS && is_serialization_failure(&e) => {
                debug!(attempt, error = %e, "Rate limit transaction conflicted, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
