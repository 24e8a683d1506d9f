//! In-memory audit log

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::audit::{AuditEntry, AuditRepository};
use crate::domain::DomainError;

/// Append-only vector of records, oldest dropped past `max_records`
#[derive(Debug)]
pub struct InMemoryAuditRepository {
    records: RwLock<Vec<AuditEntry>>,
    max_records: usize,
}

impl InMemoryAuditRepository {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records,
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryAuditRepository {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        records.push(entry);
        if records.len() > self.max_records {
            let excess = records.len() - self.max_records;
            records.drain(..excess);
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.records
            .read()
            .map(|_| ())
            .map_err(|e| DomainError::internal(format!("Audit lock poisoned: {}", e)))
    }
}
