//! Rate limiter backends

mod in_memory;
mod postgres;

pub use in_memory::InMemoryRateLimiter;
pub use postgres::PostgresRateLimiter;
