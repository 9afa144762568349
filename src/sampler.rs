//! Sampling orchestrator.
//!
//! A single task owns every piece of mutable sampler state and drives it from
//! one fixed-period tick loop. Sub-measurements run at multiples of the tick
//! index (latency grid every N ticks, topology every M ticks). Each tick ends
//! by publishing a complete [`AggregateSnapshot`]; a tick that fails or panics
//! publishes nothing and the previous snapshot stays visible.

use anyhow::Context;
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::benchmark::BenchmarkResult;
use crate::counters::{CounterSource, Totals};
use crate::error::CounterError;
use crate::health_stats::HealthStats;
use crate::history::{RollingHistory, SampleRow, MAX_SAMPLES};
use crate::latency_matrix::LatencyMatrix;
use crate::probe::{AddressFamily, PathHop, PathProbe, ReachabilityProbe};
use crate::rate::{RateSampler, Rates};
use crate::snapshot::{AggregateSnapshot, SamplerPhase, SnapshotStore};

/// Shortest tick period the loop accepts.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Tunables for the tick loop.
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub tick_interval: Duration,
    pub interface: String,
    pub reference_host: String,
    pub family: AddressFamily,
    pub ping_count: u32,
    pub ping_timeout: Duration,
    pub heatmap_every_ticks: u64,
    pub topology_every_ticks: u64,
    pub topology_max_hops: u32,
    pub topology_hop_timeout: Duration,
    pub history_capacity: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            interface: "eth0".to_string(),
            reference_host: "8.8.8.8".to_string(),
            family: AddressFamily::V4,
            ping_count: 1,
            ping_timeout: Duration::from_secs(1),
            heatmap_every_ticks: 10,
            topology_every_ticks: 60,
            topology_max_hops: 30,
            topology_hop_timeout: Duration::from_secs(2),
            history_capacity: MAX_SAMPLES,
        }
    }
}

/// External collaborators the sampler drives.
#[derive(Clone)]
pub struct Probes {
    pub reachability: Arc<dyn ReachabilityProbe>,
    pub path: Arc<dyn PathProbe>,
    pub counters: Arc<dyn CounterSource>,
}

/// Read-only view of the sampler for consumers.
#[derive(Clone)]
pub struct SamplerHandle {
    store: Arc<SnapshotStore>,
    counters: Arc<dyn CounterSource>,
    interface: String,
}

impl SamplerHandle {
    /// Latest published snapshot; `None` before the first tick completes.
    pub fn current_snapshot(&self) -> Option<Arc<AggregateSnapshot>> {
        self.store.current()
    }

    /// Fresh cumulative counters for the sampled interface.
    pub fn totals(&self) -> Result<Totals, CounterError> {
        self.counters
            .counters(&self.interface)
            .map(|snapshot| snapshot.totals())
    }

    pub fn phase(&self) -> SamplerPhase {
        self.store.phase()
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// Owner of all mutable sampling state.
pub struct Sampler {
    settings: SamplerSettings,
    probes: Probes,
    health_stats: Arc<HealthStats>,
    store: Arc<SnapshotStore>,
    rate: Option<RateSampler>,
    history: RollingHistory,
    matrix: LatencyMatrix,
    topology: Option<Vec<PathHop>>,
    pending_topology: Option<JoinHandle<Option<Vec<PathHop>>>>,
    benchmark: Option<watch::Receiver<Option<BenchmarkResult>>>,
    tick: u64,
}

impl Sampler {
    pub fn new(
        mut settings: SamplerSettings,
        probes: Probes,
        matrix: LatencyMatrix,
        health_stats: Arc<HealthStats>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        settings.tick_interval = settings.tick_interval.max(MIN_TICK_INTERVAL);
        settings.heatmap_every_ticks = settings.heatmap_every_ticks.max(1);
        settings.topology_every_ticks = settings.topology_every_ticks.max(1);
        let history = RollingHistory::new(settings.history_capacity);

        Self {
            settings,
            probes,
            health_stats,
            store,
            rate: None,
            history,
            matrix,
            topology: None,
            pending_topology: None,
            benchmark: None,
            tick: 0,
        }
    }

    /// Attaches the cell a benchmark task publishes into.
    pub fn with_benchmark(mut self, results: watch::Receiver<Option<BenchmarkResult>>) -> Self {
        self.benchmark = Some(results);
        self
    }

    pub fn handle(&self) -> SamplerHandle {
        SamplerHandle {
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.probes.counters),
            interface: self.settings.interface.clone(),
        }
    }

    /// Index the next tick will run with.
    pub fn next_tick(&self) -> u64 {
        self.tick
    }

    pub fn topology(&self) -> Option<&[PathHop]> {
        self.topology.as_deref()
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn matrix(&self) -> &LatencyMatrix {
        &self.matrix
    }

    pub fn tick_interval(&self) -> Duration {
        self.settings.tick_interval
    }

    /// Runs one tick with failure isolation. Returns whether it published.
    ///
    /// The tick index advances whether or not the tick succeeded, so cadences
    /// stay aligned with wall-clock ticks.
    pub async fn run_tick(&mut self) -> bool {
        let n = self.tick;
        self.tick = self.tick.wrapping_add(1);

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.settings.tick_interval;
        let outcome = AssertUnwindSafe(self.tick_body(n, deadline))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let success = match outcome {
            Ok(Ok(())) => {
                debug!("Tick {} published in {:.1}ms", n, duration_ms);
                true
            }
            Ok(Err(e)) => {
                error!("Tick {} failed: {:#}", n, e);
                false
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Tick {} panicked: {}", n, reason);
                false
            }
        };

        self.health_stats.record_tick(duration_ms, success);
        success
    }

    #[instrument(skip(self, deadline), fields(interface = %self.settings.interface))]
    async fn tick_body(&mut self, n: u64, deadline: tokio::time::Instant) -> anyhow::Result<()> {
        let timestamp = Utc::now();

        let latency_ms = self
            .probes
            .reachability
            .probe(
                &self.settings.reference_host,
                self.settings.ping_count,
                self.settings.ping_timeout,
                self.settings.family,
            )
            .await;
        self.health_stats.record_reachability(latency_ms);

        let current = self
            .probes
            .counters
            .counters(&self.settings.interface)
            .with_context(|| format!("reading counters for {}", self.settings.interface))?;
        let rates = match self.rate.as_mut() {
            Some(sampler) => sampler.update(current),
            None => {
                debug!("Establishing counter baseline for {}", self.settings.interface);
                self.rate = Some(RateSampler::new(current));
                Rates::default()
            }
        };

        if n % self.settings.heatmap_every_ticks == 0 {
            let missing = self.matrix.measure(self.probes.reachability.as_ref()).await;
            self.health_stats.record_heatmap(missing as u64);
        }

        if n % self.settings.topology_every_ticks == 0 {
            self.launch_topology_probe();
        }
        self.collect_topology(deadline).await;

        self.history.append(SampleRow {
            timestamp,
            latency_ms,
            down_mbps: rates.recv_mbps,
            up_mbps: rates.sent_mbps,
        });

        let snapshot = self.build_snapshot(n, rates);
        self.store.publish(snapshot);
        Ok(())
    }

    fn launch_topology_probe(&mut self) {
        if self.pending_topology.is_some() {
            debug!("Topology probe still in flight, not launching another");
            return;
        }

        let path = Arc::clone(&self.probes.path);
        let host = self.settings.reference_host.clone();
        let max_hops = self.settings.topology_max_hops;
        let timeout = self.settings.topology_hop_timeout;
        let family = self.settings.family;

        debug!("Launching topology probe to {}", host);
        self.pending_topology = Some(tokio::spawn(async move {
            path.trace(&host, max_hops, timeout, family).await
        }));
    }

    /// Waits for an in-flight topology probe until `deadline` at most.
    async fn collect_topology(&mut self, deadline: tokio::time::Instant) {
        let Some(handle) = self.pending_topology.as_mut() else {
            return;
        };

        let joined = match tokio::time::timeout_at(deadline, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!("Topology probe not finished within tick budget");
                return;
            }
        };
        self.pending_topology = None;

        let result = joined.unwrap_or_else(|e| {
            warn!("Topology probe task failed: {}", e);
            None
        });
        self.apply_topology(result);
    }

    /// A failed probe keeps the previous path; a successful one replaces it,
    /// even when it is empty.
    pub fn apply_topology(&mut self, result: Option<Vec<PathHop>>) {
        match result {
            Some(hops) => {
                info!("Topology refreshed: {} hops", hops.len());
                self.health_stats.record_topology(true);
                self.topology = Some(hops);
            }
            None => {
                warn!("Topology probe returned no result, keeping previous path");
                self.health_stats.record_topology(false);
            }
        }
    }

    fn build_snapshot(&self, n: u64, rates: Rates) -> AggregateSnapshot {
        AggregateSnapshot {
            tick: n,
            published_at: Utc::now(),
            interface: self.settings.interface.clone(),
            reference_host: self.settings.reference_host.clone(),
            history: self.history.rows(),
            topology: self.topology.clone(),
            latency_grid: self.matrix.grid(),
            rates,
            totals: self
                .rate
                .as_ref()
                .map(|r| r.totals())
                .unwrap_or_default(),
            benchmark: self.benchmark.as_ref().and_then(|rx| *rx.borrow()),
        }
    }

    /// Drives ticks until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.store.set_phase(SamplerPhase::Running);
        info!(
            "Sampler running: interface {}, reference host {}, tick {:?}",
            self.settings.interface, self.settings.reference_host, self.settings.tick_interval
        );

        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            self.run_tick().await;
        }

        if let Some(handle) = self.pending_topology.take() {
            handle.abort();
        }
        self.store.set_phase(SamplerPhase::Stopped);
        info!("Sampler stopped after {} ticks", self.tick);
    }
}
