//! CLI arguments and subcommands for netpulse.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "netpulse",
    about = "Continuous network path sampler with an HTTP snapshot API",
    long_about = "Continuous network path sampler with an HTTP snapshot API.\n\n\
                  Samples reachability latency, interface throughput, a rolling per-host \
                  latency grid and the hop-by-hop path to a reference host, and publishes \
                  the results as JSON snapshots and Prometheus metrics.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Network interface to sample (default: first active non-loopback)
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Probe over IPv6
    #[arg(long)]
    pub ipv6: bool,

    /// Tick period in milliseconds
    #[arg(long)]
    pub tick_interval_ms: Option<u64>,

    /// Host probed every tick
    #[arg(long)]
    pub reference_host: Option<String>,

    /// Echo requests per reachability probe
    #[arg(long)]
    pub ping_count: Option<u32>,

    /// Latency grid hosts (comma-separated)
    #[arg(long)]
    pub heatmap_hosts: Option<String>,

    /// Run the periodic throughput benchmark
    #[arg(long)]
    pub enable_benchmark: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify probe tools and interface detection
    Check,

    /// Run a one-shot probe and print the result
    Probe {
        /// Target host
        #[arg(long)]
        host: String,

        /// Also trace the path to the host
        #[arg(long)]
        trace: bool,

        /// Echo requests to send
        #[arg(short = 'n', long, default_value_t = 4)]
        count: u32,
    },

    /// List network interfaces with their counters
    Interfaces,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_subcommand() {
        let args = Args::parse_from(["netpulse", "probe", "--host", "1.1.1.1", "--trace"]);
        match args.command {
            Some(Commands::Probe { host, trace, count }) => {
                assert_eq!(host, "1.1.1.1");
                assert!(trace);
                assert_eq!(count, 4);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_server_flags() {
        let args = Args::parse_from([
            "netpulse",
            "-p",
            "9400",
            "--interface",
            "wlan0",
            "--heatmap-hosts",
            "1.1.1.1,9.9.9.9",
            "--log-level",
            "debug",
        ]);
        assert!(args.command.is_none());
        assert_eq!(args.port, Some(9400));
        assert_eq!(args.interface.as_deref(), Some("wlan0"));
        assert_eq!(args.heatmap_hosts.as_deref(), Some("1.1.1.1,9.9.9.9"));
        assert!(matches!(args.log_level, LogLevel::Debug));
    }
}
