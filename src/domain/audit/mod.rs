//! Audit trail of gateway requests

mod entry;
mod repository;

pub use entry::{AuditEntry, AuditOutcome, CacheType};
pub use repository::AuditRepository;

#[cfg(test)]
pub use repository::MockAuditRepository;
