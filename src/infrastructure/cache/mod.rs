//! Response cache stores

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryResponseCache, DEFAULT_MAX_ENTRIES};
pub use postgres::PostgresResponseCache;
