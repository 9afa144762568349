//! Rate derivation from monotonically increasing interface counters.
//!
//! A counter that goes backwards (interface reset, driver reload, wrap) is
//! reported as zero traffic for that interval rather than as a negative spike.
//! A non-positive interval yields all-zero rates and leaves the baseline
//! untouched so a degenerate interval never poisons the next one.

use serde::Serialize;
use tracing::{debug, warn};

use crate::counters::{CounterSnapshot, Totals};

const BITS_PER_BYTE: f64 = 8.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Per-second rates derived from two counter snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    /// Transmit throughput in megabits per second.
    pub sent_mbps: f64,
    /// Receive throughput in megabits per second.
    pub recv_mbps: f64,
    pub packets_sent_per_sec: f64,
    pub packets_recv_per_sec: f64,
}

/// Converts successive counter snapshots into rates.
#[derive(Debug, Clone)]
pub struct RateSampler {
    baseline: CounterSnapshot,
    latest: CounterSnapshot,
}

fn megabits_per_sec(delta_bytes: u64, dt: f64) -> f64 {
    delta_bytes as f64 * BITS_PER_BYTE / dt / BITS_PER_MEGABIT
}

impl RateSampler {
    /// Creates a sampler whose first interval starts at `initial`.
    pub fn new(initial: CounterSnapshot) -> Self {
        Self {
            baseline: initial,
            latest: initial,
        }
    }

    /// Computes rates between the baseline and `current`.
    pub fn update(&mut self, current: CounterSnapshot) -> Rates {
        self.latest = current;

        let dt = match current.timestamp.checked_duration_since(self.baseline.timestamp) {
            Some(elapsed) if !elapsed.is_zero() => elapsed.as_secs_f64(),
            _ => {
                debug!("Non-positive sampling interval, reporting zero rates");
                return Rates::default();
            }
        };

        let base = self.baseline;
        let delta = |now: u64, then: u64, name: &str| {
            now.checked_sub(then).unwrap_or_else(|| {
                warn!(
                    "Counter {} went backwards ({} -> {}), treating as reset",
                    name, then, now
                );
                0
            })
        };

        let rates = Rates {
            sent_mbps: megabits_per_sec(delta(current.bytes_sent, base.bytes_sent, "bytes_sent"), dt),
            recv_mbps: megabits_per_sec(delta(current.bytes_recv, base.bytes_recv, "bytes_recv"), dt),
            packets_sent_per_sec: delta(current.packets_sent, base.packets_sent, "packets_sent")
                as f64
                / dt,
            packets_recv_per_sec: delta(current.packets_recv, base.packets_recv, "packets_recv")
                as f64
                / dt,
        };

        self.baseline = current;
        rates
    }

    pub fn baseline(&self) -> &CounterSnapshot {
        &self.baseline
    }

    /// Cumulative counters of the most recently observed snapshot.
    pub fn totals(&self) -> Totals {
        self.latest.totals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn snap(at: Instant, sent: u64, recv: u64) -> CounterSnapshot {
        CounterSnapshot {
            bytes_sent: sent,
            bytes_recv: recv,
            packets_sent: sent / 100,
            packets_recv: recv / 100,
            timestamp: at,
        }
    }

    #[test]
    fn test_one_second_interval() {
        let t0 = Instant::now();
        let mut sampler = RateSampler::new(snap(t0, 1000, 2000));
        let rates = sampler.update(snap(t0 + Duration::from_secs(1), 2000, 4000));

        assert_eq!(rates.sent_mbps, 0.008);
        assert_eq!(rates.recv_mbps, 0.016);
        assert_eq!(rates.packets_sent_per_sec, 10.0);
        assert_eq!(rates.packets_recv_per_sec, 20.0);
    }

    #[test]
    fn test_half_second_interval_doubles_rate() {
        let t0 = Instant::now();
        let mut sampler = RateSampler::new(snap(t0, 0, 0));
        let rates = sampler.update(snap(t0 + Duration::from_millis(500), 1_000_000, 0));
        assert_eq!(rates.sent_mbps, 1_000_000.0 * 8.0 / 0.5 / 1_000_000.0);
    }

    #[test]
    fn test_zero_interval_keeps_baseline() {
        let t0 = Instant::now();
        let mut sampler = RateSampler::new(snap(t0, 1000, 2000));
        let rates = sampler.update(snap(t0, 5000, 9000));

        assert_eq!(rates, Rates::default());
        assert_eq!(sampler.baseline().bytes_sent, 1000);
        assert_eq!(sampler.baseline().timestamp, t0);
        // Totals still reflect the latest observation.
        assert_eq!(sampler.totals().bytes_sent, 5000);
    }

    #[test]
    fn test_backwards_clock_keeps_baseline() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut sampler = RateSampler::new(snap(t0, 1000, 2000));
        let rates = sampler.update(snap(t0 - Duration::from_secs(1), 5000, 9000));
        assert_eq!(rates, Rates::default());
        assert_eq!(sampler.baseline().timestamp, t0);
    }

    #[test]
    fn test_counter_reset_clamps_to_zero() {
        let t0 = Instant::now();
        let mut sampler = RateSampler::new(snap(t0, 50_000, 80_000));
        let rates = sampler.update(snap(t0 + Duration::from_secs(1), 100, 90_000));

        assert_eq!(rates.sent_mbps, 0.0);
        assert_eq!(rates.recv_mbps, 10_000.0 * 8.0 / 1.0 / 1_000_000.0);
        // Baseline moves to the post-reset values.
        assert_eq!(sampler.baseline().bytes_sent, 100);
    }
}
