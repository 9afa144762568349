//! Health statistics for the sampler.
//!
//! This module tracks tick performance, probe failure counts, and HTTP request
//! activity, and renders them as a plain-text table for the /health endpoint.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant, SystemTime};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe window of HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only the last 10 minutes.
            if let Some(cutoff) = now.checked_sub(Duration::from_secs(600)) {
                while guard.front().is_some_and(|&t| t < cutoff) {
                    guard.pop_front();
                }
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            match Instant::now().checked_sub(Duration::from_secs(60)) {
                Some(cutoff) => guard.iter().filter(|&&t| t >= cutoff).count() as u64,
                None => guard.len() as u64,
            }
        } else {
            0
        }
    }
}

/// Sampler health statistics.
pub struct HealthStats {
    // Tick performance
    pub tick_duration_ms: Stat,
    pub total_ticks: AtomicU64,
    pub tick_success_count: AtomicU64,
    pub tick_failure_count: AtomicU64,

    // Probe outcomes
    pub reference_latency_ms: Stat,
    pub reachability_failures: AtomicU64,
    pub heatmap_measurements: AtomicU64,
    pub heatmap_missing_cells: AtomicU64,
    pub topology_refreshes: AtomicU64,
    pub topology_failures: AtomicU64,
    pub benchmark_runs: AtomicU64,
    pub benchmark_failures: AtomicU64,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,

    // Timing
    pub start_time: Instant,
    pub last_tick_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            tick_duration_ms: Stat::default(),
            total_ticks: AtomicU64::new(0),
            tick_success_count: AtomicU64::new(0),
            tick_failure_count: AtomicU64::new(0),
            reference_latency_ms: Stat::default(),
            reachability_failures: AtomicU64::new(0),
            heatmap_measurements: AtomicU64::new(0),
            heatmap_missing_cells: AtomicU64::new(0),
            topology_refreshes: AtomicU64::new(0),
            topology_failures: AtomicU64::new(0),
            benchmark_runs: AtomicU64::new(0),
            benchmark_failures: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            start_time: Instant::now(),
            last_tick_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_tick(&self, duration_ms: f64, success: bool) {
        self.tick_duration_ms.add_sample(duration_ms);
        self.total_ticks.fetch_add(1, Ordering::Relaxed);
        if success {
            self.tick_success_count.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut guard) = self.last_tick_time.write() {
                *guard = Some(Instant::now());
            }
        } else {
            self.tick_failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_reachability(&self, latency_ms: Option<f64>) {
        match latency_ms {
            Some(ms) => self.reference_latency_ms.add_sample(ms),
            None => {
                self.reachability_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_heatmap(&self, missing_cells: u64) {
        self.heatmap_measurements.fetch_add(1, Ordering::Relaxed);
        self.heatmap_missing_cells
            .fetch_add(missing_cells, Ordering::Relaxed);
    }

    pub fn record_topology(&self, success: bool) {
        self.topology_refreshes.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.topology_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_benchmark_run(&self, success: bool) {
        self.benchmark_runs.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.benchmark_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn get_tick_success_rate(&self) -> f64 {
        let success = self.tick_success_count.load(Ordering::Relaxed);
        let failure = self.tick_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_hours(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() / 3600.0
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_tick_time_str(&self) -> String {
        const SECS_PER_DAY: u64 = 86400;
        const SECS_PER_HOUR: u64 = 3600;
        const SECS_PER_MINUTE: u64 = 60;

        if let Ok(guard) = self.last_tick_time.read() {
            if let Some(last_tick) = *guard {
                let elapsed_since_tick = last_tick.elapsed();
                if let Ok(duration) = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
                    let tick_secs = duration
                        .as_secs()
                        .saturating_sub(elapsed_since_tick.as_secs());
                    let hours = (tick_secs % SECS_PER_DAY) / SECS_PER_HOUR;
                    let minutes = (tick_secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
                    let seconds = tick_secs % SECS_PER_MINUTE;
                    return format!("{:02}:{:02}:{:02}", hours, minutes, seconds);
                }
            }
        }
        "N/A".to_string()
    }

    pub fn render_table(&self) -> String {
        let (td_cur, td_avg, td_max, td_min, _) = self.tick_duration_ms.snapshot();
        let (rl_cur, rl_avg, rl_max, rl_min, rl_count) = self.reference_latency_ms.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - SAMPLER INTERNAL STATS").ok();
        writeln!(out, "=========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "TICK PERFORMANCE").ok();
        writeln!(out, "----------------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "tick_duration (ms)",
            format!("{:.1}", td_cur),
            format!("{:.1}", td_avg),
            format!("{:.1}", td_max),
            format!("{:.1}", td_min),
            left = left_col,
            col = col_w
        )
        .ok();

        if rl_count > 0 {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                "reference_latency (ms)",
                format!("{:.2}", rl_cur),
                format!("{:.2}", rl_avg),
                format!("{:.2}", rl_max),
                format!("{:.2}", rl_min),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();

        let counters = [
            ("total_ticks", self.total_ticks.load(Ordering::Relaxed)),
            ("tick_failures", self.tick_failure_count.load(Ordering::Relaxed)),
            (
                "reachability_failures",
                self.reachability_failures.load(Ordering::Relaxed),
            ),
            (
                "heatmap_measurements",
                self.heatmap_measurements.load(Ordering::Relaxed),
            ),
            (
                "heatmap_missing_cells",
                self.heatmap_missing_cells.load(Ordering::Relaxed),
            ),
            (
                "topology_refreshes",
                self.topology_refreshes.load(Ordering::Relaxed),
            ),
            (
                "topology_failures",
                self.topology_failures.load(Ordering::Relaxed),
            ),
            ("benchmark_runs", self.benchmark_runs.load(Ordering::Relaxed)),
            (
                "benchmark_failures",
                self.benchmark_failures.load(Ordering::Relaxed),
            ),
            (
                "http_requests_last_min",
                self.http_request_timestamps.count_last_minute(),
            ),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {}", name, value, left = left_col).ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "{:left$} | {:.1}",
            "tick_success_rate (%)",
            self.get_tick_success_rate(),
            left = left_col
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {:.2}",
            "uptime (h)",
            self.get_uptime_hours(),
            left = left_col
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {}",
            "last_tick (UTC)",
            self.get_last_tick_time_str(),
            left = left_col
        )
        .ok();

        out
    }
}
