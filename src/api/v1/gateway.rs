//! Gateway endpoint handler

use axum::extract::State;
use tracing::{debug, error};

use crate::api::middleware::OptionalPrincipal;
use crate::api::state::AppState;
use crate::api::types::{ApiError, GatewayRequestBody, Json};
use crate::domain::GatewayResponse;

/// POST /v1/gateway
///
/// Body-shape errors, including an unknown feature tag, surface while
/// decoding and so are reported before the principal is checked.
///
/// The pipeline runs on its own task. Axum drops the handler future when the
/// client goes away, and a paid model answer must still reach the cache and
/// the audit log.
pub async fn handle_gateway_request(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Json(body): Json<GatewayRequestBody>,
) -> Result<Json<GatewayResponse>, ApiError> {
    debug!(
        feature_tag = %body.feature_tag,
        authenticated = principal.is_some(),
        skip_cache = body.skip_cache,
        "Processing gateway request"
    );

    let request = body.into_domain()?;
    let gateway = state.gateway.clone();

    let response = tokio::spawn(async move { gateway.handle(principal, request).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Gateway task did not complete");
            ApiError::internal("Internal server error")
        })??;

    Ok(Json(response))
}
