//! Versioned gateway API

pub mod gateway;

use axum::{routing::post, Router};

use crate::api::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new().route("/gateway", post(gateway::handle_gateway_request))
}
