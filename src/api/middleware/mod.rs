//! API middleware components

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod request_id;
pub mod security;

use axum::{body::Body, extract::MatchedPath, http::Request};

pub use auth::OptionalPrincipal;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use request_id::{response_time_middleware, REQUEST_ID_HEADER, RESPONSE_TIME_HEADER};
pub use security::security_headers_middleware;

/// Matched route pattern when available, raw path otherwise
pub(crate) fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}
