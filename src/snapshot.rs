//! Published, reader-visible sampler state.
//!
//! The sampler builds a complete [`AggregateSnapshot`] off to the side and
//! swaps a single `Arc` under a write lock. Readers clone the `Arc` under a
//! read lock and never observe a half-built snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock as StdRwLock};

use crate::benchmark::BenchmarkResult;
use crate::counters::Totals;
use crate::history::SampleRow;
use crate::latency_matrix::LatencyGrid;
use crate::probe::PathHop;
use crate::rate::Rates;

/// Lifecycle of the sampling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerPhase {
    Initializing,
    Running,
    Stopped,
}

/// Internally consistent state committed by one tick.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateSnapshot {
    /// Index of the tick that produced this snapshot.
    pub tick: u64,
    pub published_at: DateTime<Utc>,
    pub interface: String,
    pub reference_host: String,
    pub history: Vec<SampleRow>,
    /// Latest known path; `None` until the first successful topology probe.
    pub topology: Option<Vec<PathHop>>,
    pub latency_grid: LatencyGrid,
    pub rates: Rates,
    pub totals: Totals,
    /// Latest successful throughput benchmark, if any.
    pub benchmark: Option<BenchmarkResult>,
}

impl AggregateSnapshot {
    pub fn latest_row(&self) -> Option<&SampleRow> {
        self.history.last()
    }
}

/// Single-writer, multi-reader cell holding the latest snapshot.
pub struct SnapshotStore {
    current: StdRwLock<Option<Arc<AggregateSnapshot>>>,
    phase: StdRwLock<SamplerPhase>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self {
            current: StdRwLock::new(None),
            phase: StdRwLock::new(SamplerPhase::Initializing),
        }
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published snapshot wholesale.
    pub fn publish(&self, snapshot: AggregateSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }

    /// Latest published snapshot, or `None` before the first tick completes.
    pub fn current(&self) -> Option<Arc<AggregateSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_phase(&self, phase: SamplerPhase) {
        if let Ok(mut guard) = self.phase.write() {
            *guard = phase;
        }
    }

    pub fn phase(&self) -> SamplerPhase {
        self.phase
            .read()
            .map(|guard| *guard)
            .unwrap_or(SamplerPhase::Stopped)
    }
}
