//! Snapshot and totals endpoint handlers.
//!
//! `/snapshot` serves the latest published [`AggregateSnapshot`] as JSON and
//! `/totals` reads cumulative interface counters fresh on every request.
//!
//! [`AggregateSnapshot`]: netpulse::AggregateSnapshot

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::state::SharedState;

/// Handler for the /snapshot endpoint.
#[instrument(skip(state))]
pub async fn snapshot_handler(State(state): State<SharedState>) -> Response {
    debug!("Processing /snapshot request");
    state.health_stats.record_http_request();

    match state.sampler.current_snapshot() {
        Some(snapshot) => Json(snapshot.as_ref()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "no snapshot published yet",
                "phase": state.sampler.phase(),
            })),
        )
            .into_response(),
    }
}

/// Handler for the /totals endpoint.
#[instrument(skip(state))]
pub async fn totals_handler(State(state): State<SharedState>) -> Response {
    debug!("Processing /totals request");
    state.health_stats.record_http_request();

    match state.sampler.totals() {
        Ok(totals) => Json(json!({
            "interface": state.sampler.interface(),
            "totals": totals,
        }))
        .into_response(),
        Err(e) => {
            warn!("Failed to read counters: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
