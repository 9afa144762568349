//! Integration tests for health stats module.
//!
//! These tests verify that HealthStats tracks tick outcomes and probe
//! results and renders them in the plain-text table.

use netpulse::health_stats::HealthStats;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn test_health_stats_initialize_empty() {
    let stats = HealthStats::new();

    let (td_cur, td_avg, _, _, td_count) = stats.tick_duration_ms.snapshot();
    assert_eq!(td_count, 0);
    assert_eq!(td_cur, 0.0);
    assert_eq!(td_avg, 0.0);

    assert_eq!(stats.total_ticks.load(Ordering::Relaxed), 0);
    assert_eq!(stats.tick_failure_count.load(Ordering::Relaxed), 0);
    assert_eq!(stats.get_tick_success_rate(), 100.0);
    assert_eq!(stats.get_last_tick_time_str(), "N/A");
}

#[test]
fn test_health_stats_recording_methods() {
    let stats = HealthStats::new();

    stats.record_tick(12.0, true);
    stats.record_tick(30.0, false);
    stats.record_tick(18.0, true);
    stats.record_reachability(Some(9.5));
    stats.record_reachability(None);
    stats.record_heatmap(2);
    stats.record_heatmap(1);
    stats.record_topology(true);
    stats.record_topology(false);
    stats.record_benchmark_run(false);

    assert_eq!(stats.total_ticks.load(Ordering::Relaxed), 3);
    assert_eq!(stats.tick_success_count.load(Ordering::Relaxed), 2);
    assert_eq!(stats.tick_failure_count.load(Ordering::Relaxed), 1);
    assert!((stats.get_tick_success_rate() - 66.666).abs() < 0.01);

    let (_, avg, max, min, count) = stats.tick_duration_ms.snapshot();
    assert_eq!(count, 3);
    assert_eq!(avg, 20.0);
    assert_eq!(max, 30.0);
    assert_eq!(min, 12.0);

    assert_eq!(stats.reachability_failures.load(Ordering::Relaxed), 1);
    assert_eq!(stats.heatmap_measurements.load(Ordering::Relaxed), 2);
    assert_eq!(stats.heatmap_missing_cells.load(Ordering::Relaxed), 3);
    assert_eq!(stats.topology_refreshes.load(Ordering::Relaxed), 2);
    assert_eq!(stats.topology_failures.load(Ordering::Relaxed), 1);
    assert_eq!(stats.benchmark_runs.load(Ordering::Relaxed), 1);
    assert_eq!(stats.benchmark_failures.load(Ordering::Relaxed), 1);
    assert_ne!(stats.get_last_tick_time_str(), "N/A");
}

#[test]
fn test_health_stats_render_table_sections() {
    let stats = HealthStats::new();
    stats.record_tick(5.0, true);
    stats.record_reachability(Some(14.25));

    let table = stats.render_table();
    assert!(table.contains("HEALTH ENDPOINT - SAMPLER INTERNAL STATS"));
    assert!(table.contains("TICK PERFORMANCE"));
    assert!(table.contains("tick_duration (ms)"));
    assert!(table.contains("reference_latency (ms)"));
    assert!(table.contains("14.25"));
    assert!(table.contains("COUNTERS"));
    assert!(table.contains("total_ticks"));
}

#[test]
fn test_thread_safety_of_counters() {
    use std::thread;

    let stats = Arc::new(HealthStats::new());
    let mut handles = vec![];

    // Spawn multiple threads to update stats concurrently
    for i in 0..10 {
        let stats_clone = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            stats_clone.record_tick(i as f64, i % 2 == 0);
            stats_clone.record_reachability(None);
            stats_clone.record_heatmap(1);
            stats_clone.record_http_request();
        });
        handles.push(handle);
    }

    // Wait for all threads to complete
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.total_ticks.load(Ordering::Relaxed), 10);
    assert_eq!(stats.tick_success_count.load(Ordering::Relaxed), 5);
    assert_eq!(stats.reachability_failures.load(Ordering::Relaxed), 10);
    assert_eq!(stats.heatmap_missing_cells.load(Ordering::Relaxed), 10);
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 10);
}
