//! Application state management for the server.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers.

use netpulse::{HealthStats, SamplerHandle};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::metrics::SamplerMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Registry,
    pub metrics: SamplerMetrics,
    /// Read side of the sampler.
    pub sampler: SamplerHandle,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
