//! Feature tags and per-feature behaviour

mod system_prompt;
mod tag;

use std::collections::HashSet;

pub use system_prompt::SystemPromptCatalog;
pub use tag::FeatureTag;

/// Set of feature tags whose responses may be cached
#[derive(Debug, Clone)]
pub struct CacheableFeatures(HashSet<FeatureTag>);

impl CacheableFeatures {
    pub fn new(tags: impl IntoIterator<Item = FeatureTag>) -> Self {
        Self(tags.into_iter().collect())
    }

    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.0.contains(&tag)
    }
}

impl Default for CacheableFeatures {
    fn default() -> Self {
        Self::new(FeatureTag::default_cacheable())
    }
}
