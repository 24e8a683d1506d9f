//! Semantic cache configuration

use serde::{Deserialize, Serialize};

/// Configuration for similarity-based cache lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Whether semantic lookup runs after an exact miss
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity accepted as a hit (inclusive)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Number of matches wanted; the candidate cap scales with it
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Lower bound on the number of candidates scanned
    #[serde(default = "default_candidate_floor")]
    pub candidate_floor: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_top_k() -> usize {
    1
}

fn default_candidate_floor() -> usize {
    200
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            candidate_floor: default_candidate_floor(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate cap: `max(top_k * 20, floor)`
    pub fn candidate_limit(&self) -> usize {
        self.top_k.saturating_mul(20).max(self.candidate_floor)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_candidate_floor(mut self, floor: usize) -> Self {
        self.candidate_floor = floor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SemanticCacheConfig::default();

        assert!(config.enabled);
        assert!((config.similarity_threshold - 0.92).abs() < f32::EPSILON);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.candidate_limit(), 200);
    }

    #[test]
    fn test_candidate_limit_scales_with_top_k() {
        let config = SemanticCacheConfig::new().with_top_k(25).with_candidate_floor(100);
        assert_eq!(config.candidate_limit(), 500);
    }

    #[test]
    fn test_threshold_is_clamped() {
        let config = SemanticCacheConfig::new().with_similarity_threshold(1.7);
        assert_eq!(config.similarity_threshold, 1.0);
    }
}
