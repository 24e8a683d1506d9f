//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate an embedding for the request's text
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;
    use std::time::Duration;

    use super::*;

    /// Deterministic embedding provider for tests.
    ///
    /// Unless a vector is pinned for a text, it derives one from a byte hash
    /// so equal texts always embed identically.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        pinned: RwLock<HashMap<String, Vec<f32>>>,
        error: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                pinned: RwLock::new(HashMap::new()),
                error: None,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.pinned.write().unwrap().insert(text.into(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock", error));
            }

            if let Some(vector) = self.pinned.read().unwrap().get(request.input()) {
                return Ok(EmbeddingResponse::new(request.model(), vector.clone(), 1));
            }

            let hash = request
                .input()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let vector: Vec<f32> = (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64 * 7919) % 1000) as f32 / 1000.0) - 0.5)
                .collect();

            Ok(EmbeddingResponse::new(request.model(), vector, 1))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_is_deterministic() {
            let provider = MockEmbeddingProvider::new(16);

            let a = provider.embed(EmbeddingRequest::new("m", "hello")).await.unwrap();
            let b = provider.embed(EmbeddingRequest::new("m", "hello")).await.unwrap();

            assert_eq!(a.vector(), b.vector());
            assert_eq!(a.dimensions(), 16);
            assert_eq!(provider.calls(), 2);
        }

        #[tokio::test]
        async fn test_mock_pinned_vector_and_error() {
            let provider = MockEmbeddingProvider::new(2).with_vector("pinned", vec![1.0, 0.0]);
            let response = provider.embed(EmbeddingRequest::new("m", "pinned")).await.unwrap();
            assert_eq!(response.vector(), &[1.0, 0.0]);

            let failing = MockEmbeddingProvider::new(2).with_error("quota exceeded");
            assert!(failing.embed(EmbeddingRequest::new("m", "x")).await.is_err());
        }
    }
}
