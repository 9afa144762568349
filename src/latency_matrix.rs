//! Rolling per-host latency grid.
//!
//! The matrix holds `slot_count` time slots per host and a single write cursor
//! shared by all hosts. One `measure()` fills exactly one slot for every host
//! and then advances the cursor; once the cursor wraps, the oldest slot is
//! silently overwritten.

use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::probe::{AddressFamily, ReachabilityProbe};

/// Samples per host per measurement.
pub const MEASURE_PING_COUNT: u32 = 2;

/// Serializable copy of the matrix contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyGrid {
    pub hosts: Vec<String>,
    /// `cells[host][slot]`, latency in ms or `None` for a missing sample.
    pub cells: Vec<Vec<Option<f64>>>,
    pub slot_count: usize,
    /// Slot the next measurement will write.
    pub cursor: usize,
}

/// Fixed-size circular buffer indexed by (host, slot).
#[derive(Debug, Clone)]
pub struct LatencyMatrix {
    hosts: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
    slot_count: usize,
    cursor: usize,
    ping_count: u32,
    timeout: Duration,
    family: AddressFamily,
}

impl LatencyMatrix {
    /// Creates a matrix with `slot_count` empty slots per host.
    pub fn new(hosts: Vec<String>, slot_count: usize) -> Self {
        let slot_count = slot_count.max(1);
        let cells = vec![vec![None; slot_count]; hosts.len()];
        Self {
            hosts,
            cells,
            slot_count,
            cursor: 0,
            ping_count: MEASURE_PING_COUNT,
            timeout: Duration::from_secs(1),
            family: AddressFamily::V4,
        }
    }

    /// Creates a matrix sized to cover `history` at one slot per `interval`.
    pub fn with_window(hosts: Vec<String>, history: Duration, interval: Duration) -> Self {
        let slots = history
            .as_nanos()
            .checked_div(interval.as_nanos())
            .map_or(1, |n| usize::try_from(n).unwrap_or(usize::MAX));
        Self::new(hosts, slots)
    }

    /// Overrides the probe parameters used by [`measure`](Self::measure).
    pub fn with_probe_params(mut self, ping_count: u32, timeout: Duration, family: AddressFamily) -> Self {
        self.ping_count = ping_count.max(1);
        self.timeout = timeout;
        self.family = family;
        self
    }

    /// Probes every host concurrently and records the results in one slot.
    /// Returns how many hosts produced no sample.
    pub async fn measure(&mut self, probe: &dyn ReachabilityProbe) -> usize {
        let probes = self
            .hosts
            .iter()
            .map(|host| probe.probe(host, self.ping_count, self.timeout, self.family));
        let results = join_all(probes).await;

        let missing = results.iter().filter(|r| r.is_none()).count();
        debug!(
            "Latency grid slot {} measured: {} hosts, {} missing",
            self.cursor,
            self.hosts.len(),
            missing
        );

        self.record_slot(&results);
        missing
    }

    /// Writes one value per host into the current slot and advances the cursor.
    ///
    /// Hosts without a corresponding entry in `values` get a missing cell.
    pub fn record_slot(&mut self, values: &[Option<f64>]) {
        for (i, row) in self.cells.iter_mut().enumerate() {
            row[self.cursor] = values.get(i).copied().flatten();
        }
        self.cursor = (self.cursor + 1) % self.slot_count;
    }

    pub fn cell(&self, host_index: usize, slot: usize) -> Option<f64> {
        self.cells
            .get(host_index)
            .and_then(|row| row.get(slot))
            .copied()
            .flatten()
    }

    /// A host's cells ordered oldest to newest.
    pub fn chronological_row(&self, host_index: usize) -> Option<Vec<Option<f64>>> {
        let row = self.cells.get(host_index)?;
        let mut ordered = Vec::with_capacity(self.slot_count);
        ordered.extend_from_slice(&row[self.cursor..]);
        ordered.extend_from_slice(&row[..self.cursor]);
        Some(ordered)
    }

    pub fn grid(&self) -> LatencyGrid {
        LatencyGrid {
            hosts: self.hosts.clone(),
            cells: self.cells.clone(),
            slot_count: self.slot_count,
            cursor: self.cursor,
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Returns the call number (1-based) as latency, or `None` for host "down".
    struct CountingProbe {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ReachabilityProbe for CountingProbe {
        async fn probe(
            &self,
            host: &str,
            _count: u32,
            _timeout: Duration,
            _family: AddressFamily,
        ) -> Option<f64> {
            if host == "down" {
                return None;
            }
            Some(self.calls.fetch_add(1, Ordering::SeqCst) as f64 + 1.0)
        }
    }

    #[test]
    fn test_initial_cells_missing() {
        let m = LatencyMatrix::new(vec!["a".into(), "b".into()], 4);
        assert_eq!(m.cursor(), 0);
        for h in 0..2 {
            for s in 0..4 {
                assert_eq!(m.cell(h, s), None);
            }
        }
    }

    #[test]
    fn test_window_sizing() {
        let m = LatencyMatrix::with_window(
            vec!["a".into()],
            Duration::from_secs(3600),
            Duration::from_secs(10),
        );
        assert_eq!(m.slot_count(), 360);

        let tiny = LatencyMatrix::with_window(
            vec!["a".into()],
            Duration::from_secs(5),
            Duration::from_secs(10),
        );
        assert_eq!(tiny.slot_count(), 1);
    }

    #[test]
    fn test_window_sizing_sub_millisecond_interval() {
        let m = LatencyMatrix::with_window(
            vec!["a".into()],
            Duration::from_millis(2),
            Duration::from_micros(500),
        );
        assert_eq!(m.slot_count(), 4);

        let zero = LatencyMatrix::with_window(vec!["a".into()], Duration::from_secs(1), Duration::ZERO);
        assert_eq!(zero.slot_count(), 1);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut m = LatencyMatrix::new(vec!["a".into(), "b".into()], 5);
        for k in 1..=7 {
            m.record_slot(&[Some(k as f64), Some(k as f64 * 10.0)]);
            assert_eq!(m.cursor(), k % 5);
        }
        // Slot 0 was written by the 1st and then the 6th call.
        assert_eq!(m.cell(0, 0), Some(6.0));
        assert_eq!(m.cell(1, 0), Some(60.0));
        assert_eq!(m.cell(0, 1), Some(7.0));
        assert_eq!(m.cell(0, 2), Some(3.0));
    }

    #[test]
    fn test_failure_overwrites_with_missing() {
        let mut m = LatencyMatrix::new(vec!["a".into()], 1);
        m.record_slot(&[Some(5.0)]);
        m.record_slot(&[None]);
        assert_eq!(m.cell(0, 0), None);
    }

    #[test]
    fn test_chronological_row() {
        let mut m = LatencyMatrix::new(vec!["a".into()], 3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            m.record_slot(&[Some(v)]);
        }
        assert_eq!(
            m.chronological_row(0).unwrap(),
            vec![Some(2.0), Some(3.0), Some(4.0)]
        );
        assert!(m.chronological_row(1).is_none());
    }

    #[tokio::test]
    async fn test_measure_writes_one_slot_for_all_hosts() {
        let probe = CountingProbe {
            calls: AtomicU32::new(0),
        };
        let mut m = LatencyMatrix::new(vec!["up".into(), "down".into()], 3);
        let missing = m.measure(&probe).await;

        assert_eq!(missing, 1);
        assert_eq!(m.cursor(), 1);
        assert_eq!(m.cell(0, 0), Some(1.0));
        assert_eq!(m.cell(1, 0), None);
        let grid = m.grid();
        assert_eq!(grid.cells.len(), 2);
        assert_eq!(grid.cursor, 1);
    }
}
