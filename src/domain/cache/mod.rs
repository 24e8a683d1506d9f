//! Response cache domain

mod entry;
mod key;
mod repository;

pub use entry::{CacheEntry, TokenUsage};
pub use key::CacheKey;
pub use repository::ResponseCacheRepository;

#[cfg(test)]
pub use repository::MockResponseCacheRepository;
