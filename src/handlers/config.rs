//! Configuration display endpoint handler.
//!
//! This module provides the `/config` endpoint handler that returns
//! the effective configuration as JSON.

use axum::{extract::State, response::IntoResponse, Json};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the /config endpoint.
#[instrument(skip(state))]
pub async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /config request");

    // Track HTTP request
    state.health_stats.record_http_request();

    Json(state.config.as_ref().clone())
}
