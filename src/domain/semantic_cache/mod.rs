//! Semantic cache domain
//!
//! Matches semantically similar prompts by cosine similarity over a bounded
//! candidate set instead of requiring an exact hash match.

mod config;
mod search;

pub use config::SemanticCacheConfig;
pub use search::{find_best_match, SemanticMatch};
