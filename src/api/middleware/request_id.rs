//! Request correlation headers
//!
//! `X-Request-ID` itself is set and echoed by tower-http's request-id layers
//! in the router. This module adds the response timing header.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const RESPONSE_TIME_HEADER: &str = "x-response-time-ms";

/// Adds `X-Response-Time-Ms` with the handler's wall-clock time
pub async fn response_time_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    response
        .headers_mut()
        .insert(RESPONSE_TIME_HEADER, HeaderValue::from(elapsed_ms));

    response
}
