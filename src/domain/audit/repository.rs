//! Audit log persistence contract

use async_trait::async_trait;

use super::AuditEntry;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Append-only audit store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one record
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError>;

    /// Cheap connectivity probe for readiness checks
    async fn ping(&self) -> Result<(), DomainError>;
}
