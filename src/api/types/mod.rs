//! HTTP request and response types

pub mod error;
pub mod gateway;
pub mod json;

pub use error::{ApiError, ApiErrorKind, ApiErrorResponse};
pub use gateway::GatewayRequestBody;
pub use json::Json;
