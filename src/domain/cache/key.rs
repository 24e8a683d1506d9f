//! Exact-match cache key derivation

use sha2::{Digest, Sha256};

use crate::domain::feature::FeatureTag;
use crate::domain::redaction::normalize;

/// Normalized request text and its SHA-256 digest.
///
/// The hash is a pure function of (feature tag, resolved system prompt,
/// redacted prompt). The normalized text is also what gets embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    feature_tag: FeatureTag,
    normalized: String,
    hash: String,
}

impl CacheKey {
    pub fn compute(feature_tag: FeatureTag, system_prompt: &str, redacted_prompt: &str) -> Self {
        let composite = format!("{}\n{}\n{}", feature_tag.as_str(), system_prompt, redacted_prompt);
        let normalized = normalize(&composite);
        let hash = hex::encode(Sha256::digest(normalized.as_bytes()));

        Self {
            feature_tag,
            normalized,
            hash,
        }
    }

    pub fn feature_tag(&self) -> FeatureTag {
        self.feature_tag
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Short prefix safe to put in logs
    pub fn fingerprint(&self) -> &str {
        &self.hash[..12]
    }
}
