//! PostgreSQL connection pooling

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::DomainError;

/// PostgreSQL connection settings
#[derive(Clone, Deserialize)]
pub struct PostgresConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Apply pending schema migrations when the pool is created
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_url() -> String {
    "postgres://localhost/clinical_ai_gateway".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_run_migrations() -> bool {
    true
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &redact_url_password(&self.url))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub async fn connect(&self) -> Result<PgPool, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!(
            url = %redact_url_password(&self.url),
            max_connections = self.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(pool)
    }
}

/// Replaces the password component of a connection URL
fn redact_url_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];

    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    let credentials = &rest[..at];

    match credentials.find(':') {
        Some(colon) => format!(
            "{}://{}:***{}",
            &url[..scheme_end],
            &credentials[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}

/// Maps a sqlx error to a storage error with context
pub(crate) fn storage_error(context: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::storage(format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_password() {
        assert_eq!(
            redact_url_password("postgres://gateway:s3cret@db:5432/clinical"),
            "postgres://gateway:***@db:5432/clinical"
        );
    }

    #[test]
    fn test_url_without_password_unchanged() {
        assert_eq!(
            redact_url_password("postgres://localhost/clinical"),
            "postgres://localhost/clinical"
        );
        assert_eq!(
            redact_url_password("postgres://gateway@db/clinical"),
            "postgres://gateway@db/clinical"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let config = PostgresConfig::new("postgres://u:hunter2@h/db");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_defaults() {
        let config: PostgresConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.max_connections, 10);
        assert!(config.run_migrations);
    }
}
