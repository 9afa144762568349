//! Probe command implementation.
//!
//! Runs a single reachability probe (and optionally a path trace) against a
//! host and prints the result.

use netpulse::{AddressFamily, PathProbe, ReachabilityProbe, SystemPing, SystemTraceroute};
use std::time::{Duration, Instant};

use crate::config::Config;

/// Runs a one-shot probe and prints the outcome.
pub async fn command_probe(
    host: &str,
    trace: bool,
    count: u32,
    config: &Config,
) -> anyhow::Result<()> {
    let family = AddressFamily::from_ipv6_flag(config.ipv6.unwrap_or(false));
    let timeout = Duration::from_secs(config.ping_timeout_secs.unwrap_or(1));

    println!("📡 Probing {} ({} echo requests, {:?})", host, count, family);

    let start = Instant::now();
    match SystemPing::new().probe(host, count, timeout, family).await {
        Some(latency) => println!("   ✅ average RTT {:.3} ms", latency),
        None => println!("   ❌ no reply (host unreachable or ping unavailable)"),
    }
    println!("   ⏱️  took {:.2}s", start.elapsed().as_secs_f64());

    if trace {
        let topology = &config.topology;
        println!(
            "\n🗺️  Tracing path to {} (max {} hops)",
            host, topology.max_hops
        );
        let tracer = SystemTraceroute::with_deadline(Duration::from_secs(topology.deadline_secs));
        match tracer
            .trace(
                host,
                topology.max_hops,
                Duration::from_secs(topology.hop_timeout_secs),
                family,
            )
            .await
        {
            Some(hops) if hops.is_empty() => println!("   ⚠️  traceroute returned no hops"),
            Some(hops) => {
                for hop in hops {
                    println!("   {:>3}  {:<40} {}", hop.index, hop.address, hop.rtt.join(" "));
                }
            }
            None => println!("   ❌ trace failed (traceroute unavailable or timed out)"),
        }
    }

    Ok(())
}
