//! Prometheus metrics definitions for netpulse.
//!
//! Gauges are refreshed from the latest published snapshot at scrape time;
//! nothing here is updated by the sampler directly.

use chrono::Utc;
use netpulse::{AggregateSnapshot, HealthStats};
use prometheus::{Gauge, GaugeVec, Opts, Registry};
use std::sync::atomic::Ordering;

/// Collection of Prometheus metrics exported by the server.
#[derive(Clone)]
pub struct SamplerMetrics {
    // ========== Reachability ==========
    pub reference_latency_ms: Gauge,
    pub reference_reachable: Gauge,

    // ========== Interface ==========
    pub throughput_mbps: GaugeVec,       // labels: direction
    pub packets_per_second: GaugeVec,    // labels: direction
    pub interface_bytes_total: GaugeVec, // labels: direction
    pub interface_packets_total: GaugeVec, // labels: direction

    // ========== Latency grid / topology ==========
    pub host_latency_ms: GaugeVec, // labels: host
    pub topology_hops: Gauge,
    pub topology_unresponsive_hops: Gauge,

    // ========== Benchmark ==========
    pub benchmark_download_mbps: Gauge,
    pub benchmark_upload_mbps: Gauge,

    // ========== Sampler internals ==========
    pub snapshot_tick: Gauge,
    pub snapshot_age_seconds: Gauge,
    pub history_rows: Gauge,
    pub ticks_total: Gauge,
    pub tick_failures_total: Gauge,
    pub scrape_duration: Gauge,
}

impl SamplerMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, Box<dyn std::error::Error>> {
        let reference_latency_ms = Gauge::new(
            "netpulse_reference_latency_ms",
            "Average round-trip time to the reference host in the latest sample",
        )?;
        let reference_reachable = Gauge::new(
            "netpulse_reference_reachable",
            "Whether the latest reachability probe succeeded (1) or not (0)",
        )?;

        let throughput_mbps = GaugeVec::new(
            Opts::new(
                "netpulse_throughput_mbps",
                "Interface throughput in megabits per second",
            ),
            &["direction"],
        )?;
        let packets_per_second = GaugeVec::new(
            Opts::new(
                "netpulse_packets_per_second",
                "Interface packet rate per second",
            ),
            &["direction"],
        )?;
        let interface_bytes_total = GaugeVec::new(
            Opts::new(
                "netpulse_interface_bytes_total",
                "Cumulative interface byte counter at the latest sample",
            ),
            &["direction"],
        )?;
        let interface_packets_total = GaugeVec::new(
            Opts::new(
                "netpulse_interface_packets_total",
                "Cumulative interface packet counter at the latest sample",
            ),
            &["direction"],
        )?;

        let host_latency_ms = GaugeVec::new(
            Opts::new(
                "netpulse_host_latency_ms",
                "Latest latency grid sample per host",
            ),
            &["host"],
        )?;
        let topology_hops = Gauge::new(
            "netpulse_topology_hops",
            "Number of hops in the latest known path",
        )?;
        let topology_unresponsive_hops = Gauge::new(
            "netpulse_topology_unresponsive_hops",
            "Hops that did not answer in the latest known path",
        )?;

        let benchmark_download_mbps = Gauge::new(
            "netpulse_benchmark_download_mbps",
            "Download speed of the latest successful benchmark",
        )?;
        let benchmark_upload_mbps = Gauge::new(
            "netpulse_benchmark_upload_mbps",
            "Upload speed of the latest successful benchmark",
        )?;

        let snapshot_tick = Gauge::new(
            "netpulse_snapshot_tick",
            "Tick index of the published snapshot",
        )?;
        let snapshot_age_seconds = Gauge::new(
            "netpulse_snapshot_age_seconds",
            "Seconds since the published snapshot was built",
        )?;
        let history_rows = Gauge::new(
            "netpulse_history_rows",
            "Rows held in the rolling sample history",
        )?;
        let ticks_total = Gauge::new(
            "netpulse_sampler_ticks_total",
            "Ticks run since start",
        )?;
        let tick_failures_total = Gauge::new(
            "netpulse_sampler_tick_failures_total",
            "Ticks that failed or panicked since start",
        )?;
        let scrape_duration = Gauge::new(
            "netpulse_scrape_duration_seconds",
            "Time spent serving the previous /metrics request",
        )?;

        registry.register(Box::new(reference_latency_ms.clone()))?;
        registry.register(Box::new(reference_reachable.clone()))?;
        registry.register(Box::new(throughput_mbps.clone()))?;
        registry.register(Box::new(packets_per_second.clone()))?;
        registry.register(Box::new(interface_bytes_total.clone()))?;
        registry.register(Box::new(interface_packets_total.clone()))?;
        registry.register(Box::new(host_latency_ms.clone()))?;
        registry.register(Box::new(topology_hops.clone()))?;
        registry.register(Box::new(topology_unresponsive_hops.clone()))?;
        registry.register(Box::new(benchmark_download_mbps.clone()))?;
        registry.register(Box::new(benchmark_upload_mbps.clone()))?;
        registry.register(Box::new(snapshot_tick.clone()))?;
        registry.register(Box::new(snapshot_age_seconds.clone()))?;
        registry.register(Box::new(history_rows.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(tick_failures_total.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            reference_latency_ms,
            reference_reachable,
            throughput_mbps,
            packets_per_second,
            interface_bytes_total,
            interface_packets_total,
            host_latency_ms,
            topology_hops,
            topology_unresponsive_hops,
            benchmark_download_mbps,
            benchmark_upload_mbps,
            snapshot_tick,
            snapshot_age_seconds,
            history_rows,
            ticks_total,
            tick_failures_total,
            scrape_duration,
        })
    }

    /// Copies the published snapshot into the gauges.
    pub fn update_from_snapshot(&self, snapshot: &AggregateSnapshot) {
        match snapshot.latest_row().and_then(|row| row.latency_ms) {
            Some(latency) => {
                self.reference_latency_ms.set(latency);
                self.reference_reachable.set(1.0);
            }
            None => {
                self.reference_latency_ms.set(f64::NAN);
                self.reference_reachable.set(0.0);
            }
        }

        let rates = &snapshot.rates;
        self.throughput_mbps
            .with_label_values(&["sent"])
            .set(rates.sent_mbps);
        self.throughput_mbps
            .with_label_values(&["recv"])
            .set(rates.recv_mbps);
        self.packets_per_second
            .with_label_values(&["sent"])
            .set(rates.packets_sent_per_sec);
        self.packets_per_second
            .with_label_values(&["recv"])
            .set(rates.packets_recv_per_sec);

        let totals = &snapshot.totals;
        self.interface_bytes_total
            .with_label_values(&["sent"])
            .set(totals.bytes_sent as f64);
        self.interface_bytes_total
            .with_label_values(&["recv"])
            .set(totals.bytes_recv as f64);
        self.interface_packets_total
            .with_label_values(&["sent"])
            .set(totals.packets_sent as f64);
        self.interface_packets_total
            .with_label_values(&["recv"])
            .set(totals.packets_recv as f64);

        // Most recently written slot sits just behind the cursor.
        let grid = &snapshot.latency_grid;
        let slots = grid.slot_count.max(1);
        let newest = (grid.cursor + slots - 1) % slots;
        for (host, row) in grid.hosts.iter().zip(&grid.cells) {
            match row.get(newest).copied().flatten() {
                Some(latency) => self.host_latency_ms.with_label_values(&[host.as_str()]).set(latency),
                None => {
                    let _ = self.host_latency_ms.remove_label_values(&[host.as_str()]);
                }
            }
        }

        if let Some(hops) = &snapshot.topology {
            self.topology_hops.set(hops.len() as f64);
            self.topology_unresponsive_hops
                .set(hops.iter().filter(|h| h.is_unresponsive()).count() as f64);
        }

        if let Some(bench) = &snapshot.benchmark {
            self.benchmark_download_mbps.set(bench.download_mbps);
            self.benchmark_upload_mbps
                .set(bench.upload_mbps.unwrap_or(f64::NAN));
        }

        self.snapshot_tick.set(snapshot.tick as f64);
        let age = Utc::now() - snapshot.published_at;
        self.snapshot_age_seconds
            .set(age.num_milliseconds().max(0) as f64 / 1000.0);
        self.history_rows.set(snapshot.history.len() as f64);
    }

    /// Copies sampler health counters into the gauges.
    pub fn update_from_health(&self, stats: &HealthStats) {
        self.ticks_total
            .set(stats.total_ticks.load(Ordering::Relaxed) as f64);
        self.tick_failures_total
            .set(stats.tick_failure_count.load(Ordering::Relaxed) as f64);
    }
}
