//! Audit log stores

mod in_memory;
mod postgres;

pub use in_memory::InMemoryAuditRepository;
pub use postgres::PostgresAuditRepository;
