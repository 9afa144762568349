//! Interfaces command implementation.
//!
//! Lists every interface in /proc/net/dev with its cumulative counters.

use netpulse::{CounterSource, ProcNetDev};

/// Prints one line per interface, marking the default one.
pub fn command_interfaces() -> anyhow::Result<()> {
    let source = ProcNetDev::default();
    let interfaces = source.read_all()?;
    let default = source.default_interface().ok();

    println!(
        "{:<16} {:>16} {:>16} {:>12} {:>12}",
        "INTERFACE", "BYTES SENT", "BYTES RECV", "PKTS SENT", "PKTS RECV"
    );
    println!("{}", "-".repeat(76));

    for (name, stats) in &interfaces {
        let marker = if default.as_deref() == Some(name.as_str()) {
            " *"
        } else {
            ""
        };
        println!(
            "{:<16} {:>16} {:>16} {:>12} {:>12}",
            format!("{}{}", name, marker),
            stats.transmit_bytes,
            stats.receive_bytes,
            stats.transmit_packets,
            stats.receive_packets
        );
    }

    if default.is_some() {
        println!("\n* default interface");
    }
    Ok(())
}
