//! Embedding provider implementations

mod client;
mod openai;

pub use client::{EmbeddingClient, EmbeddingConfig};
pub use openai::{native_dimensions, OpenAiEmbeddingProvider};

pub use super::llm::{HttpClient, HttpClientTrait};
