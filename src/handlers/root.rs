//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that lists all
//! available endpoints with a short description.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Endpoints served by the router, with descriptions.
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("/snapshot", "Latest aggregate snapshot: history, rates, latency grid, topology (JSON)"),
    ("/totals", "Cumulative interface counters read on request (JSON)"),
    ("/metrics", "Prometheus-compatible metrics endpoint"),
    ("/health", "Sampler internal health & performance statistics (text)"),
    ("/config", "Effective runtime configuration (JSON)"),
];

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let endpoints: String = ENDPOINTS
        .iter()
        .map(|(path, desc)| {
            format!(
                "        <li>\n            <a href=\"{path}\">{path}</a>\n            <div class=\"endpoint-desc\">{desc}</div>\n        </li>\n"
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>netpulse</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background: #f5f5f5;
            line-height: 1.6;
        }}
        .container {{
            max-width: 900px;
            margin: 0 auto;
            background: white;
            padding: 40px;
            border-radius: 8px;
        }}
        h1 {{ color: #333; border-bottom: 3px solid #007bff; padding-bottom: 15px; }}
        .info {{ background: #e9ecef; padding: 15px; border-radius: 4px; margin: 20px 0; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{
            margin: 20px 0;
            padding: 15px;
            background: #f8f9fa;
            border-left: 4px solid #007bff;
        }}
        .endpoint-list a {{ color: #007bff; text-decoration: none; font-weight: 600; }}
        .endpoint-desc {{ color: #666; margin-top: 5px; }}
    </style>
</head>
<body>
<div class="container">
    <h1>netpulse</h1>
    <div class="info">
        Version <strong>{version}</strong> &middot; Uptime <strong>{uptime}</strong>
        &middot; Interface <strong>{interface}</strong> &middot; Phase <strong>{phase:?}</strong>
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
{endpoints}    </ul>
</div>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        interface = state.sampler.interface(),
        phase = state.sampler.phase(),
        endpoints = endpoints,
    );

    Html(html)
}
