//! netpulse network sampling library
//!
//! This library drives periodic measurements of a host's network path and
//! publishes them as immutable snapshots. It is framework-agnostic: the
//! binary serves snapshots over HTTP, but any consumer holding a
//! [`SamplerHandle`] can read them.
//!
//! # Features
//!
//! - **Reachability**: round-trip latency to a reference host via `ping`
//! - **Throughput**: byte and packet rates derived from interface counters
//! - **Latency grid**: rolling per-host latency across a fixed host set
//! - **Topology**: periodic hop list via `traceroute`
//! - **Benchmark**: optional download/upload saturation test on its own task
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use netpulse::{
//!     HealthStats, LatencyMatrix, ProcNetDev, Probes, Sampler, SamplerSettings, SnapshotStore,
//!     SystemPing, SystemTraceroute,
//! };
//!
//! # async fn demo() {
//! let probes = Probes {
//!     reachability: Arc::new(SystemPing::default()),
//!     path: Arc::new(SystemTraceroute::default()),
//!     counters: Arc::new(ProcNetDev::default()),
//! };
//! let matrix = LatencyMatrix::new(vec!["1.1.1.1".into(), "9.9.9.9".into()], 360);
//! let sampler = Sampler::new(
//!     SamplerSettings::default(),
//!     probes,
//!     matrix,
//!     Arc::new(HealthStats::new()),
//!     Arc::new(SnapshotStore::new()),
//! );
//! let handle = sampler.handle();
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! tokio::spawn(sampler.run(shutdown_rx));
//!
//! if let Some(snapshot) = handle.current_snapshot() {
//!     println!("{} rows", snapshot.history.len());
//! }
//! # }
//! ```

pub mod benchmark;
pub mod counters;
pub mod error;
pub mod health_stats;
pub mod history;
pub mod latency_matrix;
pub mod probe;
pub mod rate;
pub mod sampler;
pub mod snapshot;

// Re-export main types for convenience
pub use benchmark::{spawn_benchmark_task, BenchmarkResult, CurlBenchmark, ThroughputBenchmark};
pub use counters::{CounterSnapshot, CounterSource, ProcNetDev, Totals};
pub use error::{CounterError, ProbeError};
pub use health_stats::HealthStats;
pub use history::{RollingHistory, SampleRow, MAX_SAMPLES};
pub use latency_matrix::{LatencyGrid, LatencyMatrix};
pub use probe::{
    AddressFamily, PathHop, PathProbe, ReachabilityProbe, SystemPing, SystemTraceroute,
};
pub use rate::{RateSampler, Rates};
pub use sampler::{Probes, Sampler, SamplerHandle, SamplerSettings};
pub use snapshot::{AggregateSnapshot, SamplerPhase, SnapshotStore};
