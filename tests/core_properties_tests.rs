//! Integration tests for the sampler building blocks.
//!
//! Exercises the rate sampler, rolling history, latency grid and probe output
//! parsers through the public library API.

use async_trait::async_trait;
use chrono::Utc;
use netpulse::probe::{parse_ping_average, parse_traceroute};
use netpulse::{
    AddressFamily, CounterSnapshot, LatencyMatrix, RateSampler, ReachabilityProbe, RollingHistory,
    SampleRow, MAX_SAMPLES,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Answers host "a" with the measurement number (1-based); "b" never answers.
struct MeasurementCounter {
    measurements: AtomicU32,
}

#[async_trait]
impl ReachabilityProbe for MeasurementCounter {
    async fn probe(
        &self,
        host: &str,
        _count: u32,
        _timeout: Duration,
        _family: AddressFamily,
    ) -> Option<f64> {
        match host {
            "a" => Some(self.measurements.fetch_add(1, Ordering::SeqCst) as f64 + 1.0),
            _ => None,
        }
    }
}

fn counters(sent: u64, recv: u64, at: Instant) -> CounterSnapshot {
    CounterSnapshot {
        bytes_sent: sent,
        bytes_recv: recv,
        packets_sent: 0,
        packets_recv: 0,
        timestamp: at,
    }
}

fn row(latency: f64) -> SampleRow {
    SampleRow {
        timestamp: Utc::now(),
        latency_ms: Some(latency),
        down_mbps: 0.0,
        up_mbps: 0.0,
    }
}

#[test]
fn test_rates_over_one_second() {
    let t0 = Instant::now();
    let mut sampler = RateSampler::new(counters(1000, 2000, t0));
    let rates = sampler.update(counters(2000, 4000, t0 + Duration::from_secs(1)));

    assert!((rates.sent_mbps - 0.008).abs() < 1e-12);
    assert!((rates.recv_mbps - 0.016).abs() < 1e-12);
}

#[test]
fn test_zero_interval_keeps_baseline() {
    let t0 = Instant::now();
    let mut sampler = RateSampler::new(counters(1000, 2000, t0));
    let rates = sampler.update(counters(5000, 9000, t0));

    assert_eq!(rates.sent_mbps, 0.0);
    assert_eq!(rates.recv_mbps, 0.0);
    assert_eq!(sampler.baseline().bytes_sent, 1000);
}

#[test]
fn test_counter_reset_clamps_to_zero() {
    let t0 = Instant::now();
    let mut sampler = RateSampler::new(counters(5000, 5000, t0));
    let rates = sampler.update(counters(100, 6000, t0 + Duration::from_secs(1)));

    assert_eq!(rates.sent_mbps, 0.0);
    assert!(rates.recv_mbps > 0.0);
}

#[test]
fn test_history_retains_most_recent_rows() {
    let mut history = RollingHistory::default();
    let extra = 25;
    for i in 0..(MAX_SAMPLES + extra) {
        history.append(row(i as f64));
    }

    let rows = history.rows();
    assert_eq!(rows.len(), MAX_SAMPLES);
    assert_eq!(rows[0].latency_ms, Some(extra as f64));
    assert_eq!(
        rows[MAX_SAMPLES - 1].latency_ms,
        Some((MAX_SAMPLES + extra - 1) as f64)
    );
    assert_eq!(
        history.latest().and_then(|r| r.latency_ms),
        rows[MAX_SAMPLES - 1].latency_ms
    );
}

#[tokio::test]
async fn test_matrix_cursor_after_seven_measures() {
    let mut matrix = LatencyMatrix::new(vec!["a".into(), "b".into()], 5);
    let probe = MeasurementCounter {
        measurements: AtomicU32::new(0),
    };
    for k in 1..=7 {
        let missing = matrix.measure(&probe).await;
        assert_eq!(missing, 1);
        assert_eq!(matrix.cursor(), k % 5);
    }

    assert_eq!(matrix.cursor(), 2);
    assert_eq!(matrix.cell(0, 1), Some(7.0));
    assert_eq!(matrix.cell(0, 2), Some(3.0));
    assert_eq!(matrix.cell(0, 0), Some(6.0));
    assert_eq!(matrix.cell(1, 0), None);
    assert_eq!(matrix.grid().cells[0].len(), 5);
}

#[test]
fn test_probe_parsers_on_real_output() {
    let ping = "\
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.1 ms

--- 8.8.8.8 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 12.100/12.100/12.100/0.000 ms
";
    assert_eq!(parse_ping_average(ping).unwrap(), 12.1);

    let trace = "\
traceroute to 8.8.8.8 (8.8.8.8), 30 hops max, 60 byte packets
 1  192.168.1.1  1.123 ms  0.998 ms  1.010 ms
 2  * * *
 3  8.8.8.8  12.001 ms  11.870 ms  12.300 ms
";
    let hops = parse_traceroute(trace);
    assert_eq!(hops.len(), 3);
    assert!(hops[1].is_unresponsive());
    assert_eq!(hops[2].address, "8.8.8.8");
}

#[test]
fn test_partially_answered_hop_is_unresponsive() {
    let trace = "\
traceroute to 8.8.8.8 (8.8.8.8), 30 hops max, 60 byte packets
 1  192.168.1.1  1.123 ms  0.998 ms  1.010 ms
 2  * 10.0.0.1  5.0 ms  *
 3  8.8.8.8  12.001 ms
";
    let hops = parse_traceroute(trace);
    assert_eq!(hops.len(), 3);
    assert_eq!(hops[1].index, 2);
    assert!(hops[1].is_unresponsive());
    assert!(hops[1].rtt.is_empty());
    assert_eq!(hops[2].rtt, vec!["12.001", "ms"]);
}
