//! HTTP endpoint handlers for the server.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Endpoint listing
//! - `/snapshot`: Latest aggregate snapshot (JSON)
//! - `/totals`: Fresh cumulative interface counters (JSON)
//! - `/health`: Sampler health table (text)
//! - `/metrics`: Prometheus metrics endpoint
//! - `/config`: Effective configuration (JSON)

pub mod config;
pub mod health;
pub mod metrics;
pub mod root;
pub mod snapshot;

// Re-export handlers
pub use config::config_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
pub use snapshot::{snapshot_handler, totals_handler};
