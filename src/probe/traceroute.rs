//! Path-discovery probe backed by the system `traceroute` tool.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::command::run_with_deadline;
use super::{AddressFamily, PathHop, PathProbe, UNRESPONSIVE_HOP};
use crate::error::ProbeError;

/// Default upper bound on a whole traceroute invocation.
pub const DEFAULT_TRACE_DEADLINE: Duration = Duration::from_secs(30);

/// Parses `traceroute` output into an ordered hop list.
///
/// The header line, blank lines, lines with fewer than two tokens, lines
/// whose first token is not a hop index, and lines whose index does not
/// exceed the previous hop are skipped. RTT tokens are kept verbatim.
///
/// The address is the second token only. A hop whose first probe timed out
/// (`2  * 10.0.0.1  5.0 ms  *`) is recorded as unresponsive with no RTT,
/// even if a later probe on the same line answered.
pub fn parse_traceroute(output: &str) -> Vec<PathHop> {
    let mut hops: Vec<PathHop> = Vec::new();

    for line in output.lines() {
        if line.starts_with("traceroute") || line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }

        let Ok(index) = tokens[0].parse::<u32>() else {
            continue;
        };
        if hops.last().is_some_and(|prev| index <= prev.index) {
            continue;
        }

        let address = tokens[1].to_string();
        let rtt = if address == UNRESPONSIVE_HOP {
            Vec::new()
        } else {
            tokens[2..].iter().map(|t| t.to_string()).collect()
        };

        hops.push(PathHop {
            index,
            address,
            rtt,
        });
    }

    hops
}

/// Runs `traceroute`/`traceroute6` as a child process.
#[derive(Debug, Clone)]
pub struct SystemTraceroute {
    pub traceroute_program: String,
    pub traceroute6_program: String,
    /// Upper bound on the whole invocation regardless of hop count.
    pub deadline: Duration,
}

impl Default for SystemTraceroute {
    fn default() -> Self {
        Self {
            traceroute_program: "traceroute".to_string(),
            traceroute6_program: "traceroute6".to_string(),
            deadline: DEFAULT_TRACE_DEADLINE,
        }
    }
}

impl SystemTraceroute {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }

    fn program(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.traceroute_program,
            AddressFamily::V6 => &self.traceroute6_program,
        }
    }

    async fn try_trace(
        &self,
        host: &str,
        max_hops: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Result<Vec<PathHop>, ProbeError> {
        let timeout_secs = timeout.as_secs().max(1);
        let args = vec![
            "-m".to_string(),
            max_hops.max(1).to_string(),
            "-w".to_string(),
            timeout_secs.to_string(),
            host.to_string(),
        ];
        // Three probes per hop by default.
        let worst_case =
            Duration::from_secs(timeout_secs * 3 * max_hops.max(1) as u64) + Duration::from_secs(1);
        let deadline = worst_case.min(self.deadline);

        let output = run_with_deadline(self.program(family), &args, deadline).await?;
        Ok(parse_traceroute(&output))
    }
}

#[async_trait]
impl PathProbe for SystemTraceroute {
    async fn trace(
        &self,
        host: &str,
        max_hops: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Option<Vec<PathHop>> {
        match self.try_trace(host, max_hops, timeout, family).await {
            Ok(hops) => Some(hops),
            Err(e) => {
                debug!("Topology probe to {} failed: {}", host, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(index: u32, address: &str, rtt: &[&str]) -> PathHop {
        PathHop {
            index,
            address: address.to_string(),
            rtt: rtt.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_simple_ipv4_path() {
        let out = "traceroute to 8.8.8.8, 30 hops max\n\
                   1  192.168.1.1  1.123 ms\n\
                   2  10.0.0.1  2.456 ms\n\
                   3  8.8.8.8  3.789 ms\n";
        assert_eq!(
            parse_traceroute(out),
            vec![
                hop(1, "192.168.1.1", &["1.123", "ms"]),
                hop(2, "10.0.0.1", &["2.456", "ms"]),
                hop(3, "8.8.8.8", &["3.789", "ms"]),
            ]
        );
    }

    #[test]
    fn test_ipv6_path_with_leading_whitespace() {
        let out = "traceroute to 2001:4860:4860::8888, 30 hops max\n \
                   1  2001:db8::1  1.123 ms\n \
                   2  2001:4860:4860::8888  3.789 ms\n";
        let hops = parse_traceroute(out);
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[1].address, "2001:4860:4860::8888");
    }

    #[test]
    fn test_unresponsive_hop_has_no_rtt() {
        let out = " 1  192.168.1.1  0.512 ms  0.498 ms  0.480 ms\n \
                   2  * * *\n \
                   3  10.1.1.1  9.000 ms\n";
        let hops = parse_traceroute(out);
        assert_eq!(hops.len(), 3);
        assert!(hops[1].is_unresponsive());
        assert!(hops[1].rtt.is_empty());
        assert_eq!(hops[0].rtt.len(), 6);
    }

    #[test]
    fn test_continuation_and_short_lines_skipped() {
        let out = " 1  192.168.1.1  1.0 ms\n \
                   2  10.0.0.1  2.0 ms\n    \
                   10.0.0.2  2.1 ms\n \
                   7\n \
                   2  10.0.0.9  2.2 ms\n \
                   3  8.8.8.8  3.0 ms\n";
        let hops = parse_traceroute(out);
        let indices: Vec<u32> = hops.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(hops[1].address, "10.0.0.1");
    }

    #[test]
    fn test_header_only_is_empty_success() {
        let out = "traceroute to 8.8.8.8 (8.8.8.8), 30 hops max, 60 byte packets\n";
        assert!(parse_traceroute(out).is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_returns_none() {
        let tr = SystemTraceroute {
            traceroute_program: "netpulse-no-such-traceroute".to_string(),
            traceroute6_program: "netpulse-no-such-traceroute6".to_string(),
            deadline: Duration::from_secs(1),
        };
        let result = tr
            .trace("127.0.0.1", 3, Duration::from_secs(1), AddressFamily::V4)
            .await;
        assert!(result.is_none());
    }
}
