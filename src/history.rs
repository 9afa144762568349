//! Rolling history of per-tick samples.
//!
//! This module provides a fixed-capacity ring of sample rows with predictable
//! memory usage. Once full, every append overwrites the oldest row.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of rows retained (one hour at one row per second).
pub const MAX_SAMPLES: usize = 3600;

/// One aligned row of the rolling history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleRow {
    pub timestamp: DateTime<Utc>,
    /// Reference-host latency in ms; `None` marks a gap.
    pub latency_ms: Option<f64>,
    pub down_mbps: f64,
    pub up_mbps: f64,
}

/// A circular buffer of sample rows with fixed capacity.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    rows: Vec<SampleRow>,
    capacity: usize,
    write_index: usize,
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(MAX_SAMPLES)
    }
}

impl RollingHistory {
    /// Creates an empty history holding at most `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
            write_index: 0,
        }
    }

    /// Appends a row, evicting the oldest one when full.
    pub fn append(&mut self, row: SampleRow) {
        if self.rows.len() < self.capacity {
            self.rows.push(row);
        } else {
            self.rows[self.write_index] = row;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    /// Returns all rows in arrival order (oldest to newest).
    pub fn rows(&self) -> Vec<SampleRow> {
        if self.rows.len() < self.capacity {
            return self.rows.clone();
        }

        let mut result = Vec::with_capacity(self.capacity);
        result.extend_from_slice(&self.rows[self.write_index..]);
        result.extend_from_slice(&self.rows[..self.write_index]);
        result
    }

    /// Returns the most recently appended row.
    pub fn latest(&self) -> Option<&SampleRow> {
        if self.rows.is_empty() {
            return None;
        }
        let newest = (self.write_index + self.capacity - 1) % self.capacity;
        self.rows.get(newest)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
