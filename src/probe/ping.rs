//! Reachability probe backed by the system `ping` tool.
//!
//! Both the iputils summary (`rtt min/avg/max/mdev = ...`) and the BSD/macOS
//! summary (`round-trip min/avg/max/stddev = ...`) are understood, as is the
//! three-field busybox form. Only the average is reported.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::debug;

use super::command::run_with_deadline;
use super::{AddressFamily, ReachabilityProbe};
use crate::error::ProbeError;

/// Marker that identifies a summary statistics line.
const SUMMARY_MARKER: &str = "min/avg/max";

/// Extra time granted to the tool on top of `count * timeout`.
const DEADLINE_SLACK: Duration = Duration::from_secs(1);

static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"min/avg/max(?:/[a-z]+)?\s*=\s*([0-9.,]+)/([0-9.,]+)/([0-9.,]+)")
        .expect("summary regex is valid")
});

/// Parses a decimal that may use a comma as the decimal separator.
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse::<f64>().ok()
}

/// Extracts the average round-trip time (ms) from `ping` output.
///
/// The first summary-like line decides the outcome; later ones are ignored.
pub fn parse_ping_average(output: &str) -> Result<f64, ProbeError> {
    let line = output
        .lines()
        .find(|line| line.contains(SUMMARY_MARKER))
        .ok_or_else(|| ProbeError::ParseFailure {
            tool: "ping".to_string(),
            detail: "no summary line".to_string(),
        })?;

    SUMMARY_RE
        .captures(line)
        .and_then(|caps| caps.get(2))
        .and_then(|avg| parse_decimal(avg.as_str()))
        .ok_or_else(|| ProbeError::ParseFailure {
            tool: "ping".to_string(),
            detail: format!("unparseable summary line: {}", line.trim()),
        })
}

/// Runs `ping`/`ping6` as a child process.
#[derive(Debug, Clone)]
pub struct SystemPing {
    pub ping_program: String,
    pub ping6_program: String,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self {
            ping_program: "ping".to_string(),
            ping6_program: "ping6".to_string(),
        }
    }
}

impl SystemPing {
    pub fn new() -> Self {
        Self::default()
    }

    fn program(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.ping_program,
            AddressFamily::V6 => &self.ping6_program,
        }
    }

    async fn try_probe(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Result<f64, ProbeError> {
        let count = count.max(1);
        let timeout_secs = timeout.as_secs().max(1);
        let args = vec![
            "-c".to_string(),
            count.to_string(),
            "-W".to_string(),
            timeout_secs.to_string(),
            host.to_string(),
        ];
        let deadline = Duration::from_secs(timeout_secs * count as u64) + DEADLINE_SLACK;

        let output = run_with_deadline(self.program(family), &args, deadline).await?;
        parse_ping_average(&output)
    }
}

#[async_trait]
impl ReachabilityProbe for SystemPing {
    async fn probe(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
        family: AddressFamily,
    ) -> Option<f64> {
        match self.try_probe(host, count, timeout, family).await {
            Ok(avg) => Some(avg),
            Err(e) => {
                debug!("Reachability probe to {} failed: {}", host, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BSD_OUTPUT: &str = "PING 8.8.8.8 (8.8.8.8): 56 data bytes\n\
        64 bytes from 8.8.8.8: icmp_seq=0 ttl=56 time=12.994 ms\n\
        64 bytes from 8.8.8.8: icmp_seq=1 ttl=56 time=14.123 ms\n\
        \n\
        --- 8.8.8.8 ping statistics ---\n\
        4 packets transmitted, 4 packets received, 0.0% packet loss\n\
        round-trip min/avg/max/stddev = 12.994/13.610/14.302/0.640 ms\n";

    const LINUX_V6_OUTPUT: &str =
        "PING6 2001:4860:4860::8888(2001:4860:4860::8888) 56 data bytes\n\
        64 bytes from 2001:4860:4860::8888: icmp_seq=1 ttl=56 time=15.6 ms\n\
        \n\
        --- 2001:4860:4860::8888 ping statistics ---\n\
        4 packets transmitted, 4 received, 0% packet loss, time 3005ms\n\
        rtt min/avg/max/mdev = 14.800/15.250/15.600/0.294 ms\n";

    #[test]
    fn test_bsd_summary_average() {
        assert_eq!(parse_ping_average(BSD_OUTPUT).unwrap(), 13.610);
    }

    #[test]
    fn test_linux_summary_average() {
        assert_eq!(parse_ping_average(LINUX_V6_OUTPUT).unwrap(), 15.250);
    }

    #[test]
    fn test_busybox_three_field_summary() {
        let out = "round-trip min/avg/max = 0.051/0.063/0.075 ms\n";
        assert_eq!(parse_ping_average(out).unwrap(), 0.063);
    }

    #[test]
    fn test_decimal_comma_locale() {
        let out = "rtt min/avg/max/mdev = 12,994/13,610/14,302/0,640 ms\n";
        assert_eq!(parse_ping_average(out).unwrap(), 13.61);
    }

    #[test]
    fn test_first_summary_line_wins() {
        let out = "rtt min/avg/max/mdev = 1.0/2.0/3.0/0.1 ms\n\
                   rtt min/avg/max/mdev = 4.0/5.0/6.0/0.1 ms\n";
        assert_eq!(parse_ping_average(out).unwrap(), 2.0);
    }

    #[test]
    fn test_missing_summary_is_parse_failure() {
        let out = "PING 10.255.255.1 (10.255.255.1) 56(84) bytes of data.\n\
                   --- 10.255.255.1 ping statistics ---\n\
                   2 packets transmitted, 0 received, 100% packet loss\n";
        assert!(matches!(
            parse_ping_average(out),
            Err(ProbeError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_garbled_summary_is_parse_failure() {
        let out = "rtt min/avg/max/mdev = n/a\n";
        assert!(parse_ping_average(out).is_err());
    }

    #[tokio::test]
    async fn test_missing_tool_returns_none() {
        let ping = SystemPing {
            ping_program: "netpulse-no-such-ping".to_string(),
            ping6_program: "netpulse-no-such-ping6".to_string(),
        };
        let result = ping
            .probe("127.0.0.1", 1, Duration::from_secs(1), AddressFamily::V4)
            .await;
        assert!(result.is_none());
    }
}
