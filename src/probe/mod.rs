//! External probe clients.
//!
//! This module wraps the platform reachability tool (`ping`/`ping6`) and
//! path-discovery tool (`traceroute`/`traceroute6`). Both are invoked as
//! child processes with an explicit deadline and their text output is parsed
//! into structured measurements. Every failure mode collapses into `None`
//! at the trait boundary so callers only ever see "a value" or "no data".

pub mod command;
pub mod ping;
pub mod traceroute;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use ping::{parse_ping_average, SystemPing};
pub use traceroute::{parse_traceroute, SystemTraceroute};

/// Address family used when invoking a probe tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    V4,
    V6,
}

impl AddressFamily {
    pub fn from_ipv6_flag(ipv6: bool) -> Self {
        if ipv6 {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }
}

/// Sentinel address reported for a hop that did not answer.
pub const UNRESPONSIVE_HOP: &str = "*";

/// One hop of a path-discovery result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathHop {
    /// 1-based hop index, strictly increasing within one result.
    pub index: u32,
    /// Responding address, or `"*"` when the hop did not answer.
    pub address: String,
    /// Remaining tokens of the line verbatim (values and units as separate tokens).
    pub rtt: Vec<String>,
}

impl PathHop {
    pub fn is_unresponsive(&self) -> bool {
        self.address == UNRESPONSIVE_HOP
    }
}

/// Reachability probe executor.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns the average round-trip time in milliseconds, or `None` when the
    /// host is unreachable or the tool produced no usable summary.
    async fn probe(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Option<f64>;
}

/// Path-discovery probe executor.
#[async_trait]
pub trait PathProbe: Send + Sync {
    /// Returns the ordered hop list, or `None` when the probe failed.
    /// An empty list is a successful probe that reported no hops.
    async fn trace(
        &self,
        host: &str,
        max_hops: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Option<Vec<PathHop>>;
}
