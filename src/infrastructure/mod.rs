//! Infrastructure layer - External service implementations

pub mod audit;
pub mod auth;
pub mod cache;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod rate_limit;
pub mod services;
pub mod storage;
