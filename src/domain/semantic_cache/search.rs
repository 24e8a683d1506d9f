use crate::domain::cache::CacheEntry;
use crate::domain::embedding::cosine_similarity;

/// Best candidate found by a similarity scan
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub entry: CacheEntry,
    pub similarity: f32,
}

/// Scans `candidates` for the entry most similar to `query`.
///
/// Candidates whose embedding is missing or has the wrong dimensionality are
/// skipped. Ties keep the first candidate scanned. The best candidate is
/// returned only when its similarity is at least `threshold`.
pub fn find_best_match(
    query: &[f32],
    candidates: Vec<CacheEntry>,
    expected_dimensions: usize,
    threshold: f32,
) -> Option<SemanticMatch> {
    if query.len() != expected_dimensions {
        return None;
    }

    let mut best: Option<SemanticMatch> = None;

    for entry in candidates {
        let Some(embedding) = entry.embedding.as_deref() else {
            continue;
        };

        if embedding.len() != expected_dimensions {
            continue;
        }

        let similarity = cosine_similarity(query, embedding);

        if best.as_ref().is_none_or(|b| similarity > b.similarity) {
            best = Some(SemanticMatch { entry, similarity });
        }
    }

    best.filter(|m| m.similarity >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheKey, TokenUsage};
    use crate::domain::feature::FeatureTag;
    use chrono::Duration;

    fn entry_with(response: &str, embedding: Option<Vec<f32>>) -> CacheEntry {
        let key = CacheKey::compute(FeatureTag::ClinicalGuidelines, "sys", response);
        let entry = CacheEntry::new(&key, response, "model", TokenUsage::default(), Duration::days(7));

        match embedding {
            Some(e) => entry.with_embedding(e),
            None => entry,
        }
    }

    /// Unit vector whose cosine similarity with [1, 0] equals `similarity`
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    #[test]
    fn test_hit_above_threshold() {
        let candidates = vec![entry_with("close", Some(at_similarity(0.93)))];

        let found = find_best_match(&[1.0, 0.0], candidates, 2, 0.92).unwrap();

        assert_eq!(found.entry.response, "close");
        assert!((found.similarity - 0.93).abs() < 1e-4);
    }

    #[test]
    fn test_miss_below_threshold() {
        let candidates = vec![entry_with("far", Some(at_similarity(0.85)))];
        assert!(find_best_match(&[1.0, 0.0], candidates, 2, 0.92).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let candidates = vec![entry_with("exact", Some(vec![1.0, 0.0]))];
        assert!(find_best_match(&[1.0, 0.0], candidates, 2, 1.0).is_some());
    }

    #[test]
    fn test_picks_maximum() {
        let candidates = vec![
            entry_with("a", Some(at_similarity(0.93))),
            entry_with("b", Some(at_similarity(0.99))),
            entry_with("c", Some(at_similarity(0.95))),
        ];

        let found = find_best_match(&[1.0, 0.0], candidates, 2, 0.92).unwrap();
        assert_eq!(found.entry.response, "b");
    }

    #[test]
    fn test_ties_keep_first_scanned() {
        let candidates = vec![
            entry_with("first", Some(vec![0.0, 1.0, 0.0])),
            entry_with("second", Some(vec![0.0, 1.0, 0.0])),
        ];

        let found = find_best_match(&[0.0, 1.0, 0.0], candidates, 3, 0.92).unwrap();
        assert_eq!(found.entry.response, "first");
    }

    #[test]
    fn test_skips_wrong_dimensions_and_missing_embeddings() {
        let candidates = vec![
            entry_with("no-embedding", None),
            entry_with("wrong-dims", Some(vec![1.0, 0.0, 0.0])),
            entry_with("valid", Some(at_similarity(0.95))),
        ];

        let found = find_best_match(&[1.0, 0.0], candidates, 2, 0.92).unwrap();
        assert_eq!(found.entry.response, "valid");
    }

    #[test]
    fn test_query_with_wrong_dimensions_misses() {
        let candidates = vec![entry_with("valid", Some(vec![1.0, 0.0]))];
        assert!(find_best_match(&[1.0, 0.0, 0.0], candidates, 2, 0.5).is_none());
    }
}
