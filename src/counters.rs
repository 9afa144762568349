//! Network interface counter source.
//!
//! This module reads interface statistics from /proc/net/dev and resolves the
//! default interface from /sys/class/net. The sampler only needs
//! "current counters for interface X" and "which interface is the default",
//! both expressed by the [`CounterSource`] trait.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::CounterError;

/// ARPHRD_LOOPBACK as reported by /sys/class/net/<iface>/type.
const ARPHRD_LOOPBACK: &str = "772";

/// Interface counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub timestamp: Instant,
}

impl CounterSnapshot {
    pub fn totals(&self) -> Totals {
        Totals {
            bytes_sent: self.bytes_sent,
            bytes_recv: self.bytes_recv,
            packets_sent: self.packets_sent,
            packets_recv: self.packets_recv,
        }
    }
}

/// Cumulative counters, independent of any rate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// Source of interface counters.
pub trait CounterSource: Send + Sync {
    /// Current counters for `interface`, stamped with the read instant.
    fn counters(&self, interface: &str) -> Result<CounterSnapshot, CounterError>;

    /// First interface that is up and not loopback.
    fn default_interface(&self) -> Result<String, CounterError>;
}

/// Network interface statistics as found in one /proc/net/dev line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetDevStats {
    pub receive_bytes: u64,
    pub receive_packets: u64,
    pub transmit_bytes: u64,
    pub transmit_packets: u64,
}

/// Parses the content of /proc/net/dev.
///
/// Malformed lines are skipped; the two header lines are ignored.
pub fn parse_net_dev(content: &str) -> BTreeMap<String, NetDevStats> {
    let mut stats = BTreeMap::new();

    for line in content.lines().skip(2) {
        // Interface names never contain ':', counters follow the first one.
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let field = |i: usize| values[i].parse::<u64>().unwrap_or(0);
        stats.insert(
            name.trim().to_string(),
            NetDevStats {
                receive_bytes: field(0),
                receive_packets: field(1),
                transmit_bytes: field(8),
                transmit_packets: field(9),
            },
        );
    }

    stats
}

/// Counter source backed by procfs and sysfs.
#[derive(Debug, Clone)]
pub struct ProcNetDev {
    net_dev_path: PathBuf,
    sys_class_net: PathBuf,
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::new("/proc/net/dev", "/sys/class/net")
    }
}

impl ProcNetDev {
    pub fn new(net_dev_path: impl Into<PathBuf>, sys_class_net: impl Into<PathBuf>) -> Self {
        Self {
            net_dev_path: net_dev_path.into(),
            sys_class_net: sys_class_net.into(),
        }
    }

    pub fn net_dev_path(&self) -> &Path {
        &self.net_dev_path
    }

    /// Reads and parses all interfaces.
    pub fn read_all(&self) -> Result<BTreeMap<String, NetDevStats>, CounterError> {
        let content = fs::read_to_string(&self.net_dev_path).map_err(|source| CounterError::Io {
            path: self.net_dev_path.display().to_string(),
            source,
        })?;
        Ok(parse_net_dev(&content))
    }

    fn read_attr(dir: &Path, attr: &str) -> Option<String> {
        fs::read_to_string(dir.join(attr))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl CounterSource for ProcNetDev {
    fn counters(&self, interface: &str) -> Result<CounterSnapshot, CounterError> {
        let all = self.read_all()?;
        let timestamp = Instant::now();
        let stats = all
            .get(interface)
            .ok_or_else(|| CounterError::InterfaceNotFound(interface.to_string()))?;

        Ok(CounterSnapshot {
            bytes_sent: stats.transmit_bytes,
            bytes_recv: stats.receive_bytes,
            packets_sent: stats.transmit_packets,
            packets_recv: stats.receive_packets,
            timestamp,
        })
    }

    fn default_interface(&self) -> Result<String, CounterError> {
        let entries = fs::read_dir(&self.sys_class_net).map_err(|source| CounterError::Io {
            path: self.sys_class_net.display().to_string(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        names
            .into_iter()
            .find(|name| {
                let dir = self.sys_class_net.join(name);
                let is_up = Self::read_attr(&dir, "operstate").as_deref() == Some("up");
                let is_loopback = name == "lo"
                    || Self::read_attr(&dir, "type").as_deref() == Some(ARPHRD_LOOPBACK);
                is_up && !is_loopback
            })
            .ok_or(CounterError::NoActiveInterface)
    }
}
