//! Configuration management for netpulse.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use netpulse::latency_matrix::MEASURE_PING_COUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9310;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REFERENCE_HOST: &str = "8.8.8.8";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down?bytes=25000000";
pub const DEFAULT_UPLOAD_URL: &str = "https://speed.cloudflare.com/__up";

/// Latency grid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Hosts measured on every grid refresh
    #[serde(default = "default_heatmap_hosts")]
    pub hosts: Vec<String>,

    /// Refresh the grid every N ticks (default: 10)
    #[serde(default = "default_heatmap_every_ticks", alias = "every-ticks")]
    pub every_ticks: u64,

    /// Time window the grid covers in seconds (default: 3600)
    #[serde(default = "default_history_seconds", alias = "history-seconds")]
    pub history_seconds: u64,

    /// Echo requests per host per refresh (default: 2)
    #[serde(default = "default_heatmap_ping_count", alias = "ping-count")]
    pub ping_count: u32,
}

fn default_heatmap_hosts() -> Vec<String> {
    vec!["8.8.8.8".into(), "1.1.1.1".into(), "9.9.9.9".into()]
}
fn default_heatmap_every_ticks() -> u64 {
    10
}
fn default_history_seconds() -> u64 {
    3600
}
fn default_heatmap_ping_count() -> u32 {
    MEASURE_PING_COUNT
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            hosts: default_heatmap_hosts(),
            every_ticks: default_heatmap_every_ticks(),
            history_seconds: default_history_seconds(),
            ping_count: default_heatmap_ping_count(),
        }
    }
}

/// Topology (traceroute) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Refresh the path every N ticks (default: 60)
    #[serde(default = "default_topology_every_ticks", alias = "every-ticks")]
    pub every_ticks: u64,

    #[serde(default = "default_max_hops", alias = "max-hops")]
    pub max_hops: u32,

    /// Per-hop wait in seconds (default: 2)
    #[serde(default = "default_hop_timeout_secs", alias = "hop-timeout-secs")]
    pub hop_timeout_secs: u64,

    /// Hard cap on one traceroute run in seconds (default: 30)
    #[serde(default = "default_deadline_secs", alias = "deadline-secs")]
    pub deadline_secs: u64,
}

fn default_topology_every_ticks() -> u64 {
    60
}
fn default_max_hops() -> u32 {
    30
}
fn default_hop_timeout_secs() -> u64 {
    2
}
fn default_deadline_secs() -> u64 {
    30
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            every_ticks: default_topology_every_ticks(),
            max_hops: default_max_hops(),
            hop_timeout_secs: default_hop_timeout_secs(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

/// Throughput benchmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between benchmark runs (default: 60)
    #[serde(default = "default_benchmark_interval", alias = "interval-seconds")]
    pub interval_seconds: u64,

    #[serde(default = "default_download_url", alias = "download-url")]
    pub download_url: String,

    #[serde(default = "default_upload_url", alias = "upload-url")]
    pub upload_url: String,

    /// Request body size for the upload leg (default: 10 MB)
    #[serde(default = "default_upload_bytes", alias = "upload-bytes")]
    pub upload_bytes: usize,

    /// Timeout per leg in seconds (default: 20)
    #[serde(default = "default_benchmark_timeout", alias = "timeout-secs")]
    pub timeout_secs: u64,
}

fn default_benchmark_interval() -> u64 {
    60
}
fn default_download_url() -> String {
    DEFAULT_DOWNLOAD_URL.to_string()
}
fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}
fn default_upload_bytes() -> usize {
    10_000_000
}
fn default_benchmark_timeout() -> u64 {
    20
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_benchmark_interval(),
            download_url: default_download_url(),
            upload_url: default_upload_url(),
            upload_bytes: default_upload_bytes(),
            timeout_secs: default_benchmark_timeout(),
        }
    }
}

/// Effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    /// Interface to sample; resolved automatically when unset
    pub interface: Option<String>,
    pub ipv6: Option<bool>,
    #[serde(alias = "tick-interval-ms")]
    pub tick_interval_ms: Option<u64>,
    #[serde(alias = "reference-host")]
    pub reference_host: Option<String>,
    #[serde(alias = "ping-count")]
    pub ping_count: Option<u32>,
    #[serde(alias = "ping-timeout-secs")]
    pub ping_timeout_secs: Option<u64>,

    // Logging
    pub log_level: Option<String>,

    #[serde(default)]
    pub heatmap: HeatmapConfig,

    #[serde(default)]
    pub topology: TopologyConfig,

    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            interface: None,
            ipv6: Some(false),
            tick_interval_ms: Some(DEFAULT_TICK_INTERVAL_MS),
            reference_host: Some(DEFAULT_REFERENCE_HOST.to_string()),
            ping_count: Some(1),
            ping_timeout_secs: Some(1),
            log_level: Some("info".into()),
            heatmap: HeatmapConfig::default(),
            topology: TopologyConfig::default(),
            benchmark: BenchmarkConfig::default(),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let tick_ms = cfg.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS);
    if tick_ms == 0 {
        return Err("tick_interval_ms must be greater than zero".into());
    }

    if cfg
        .reference_host
        .as_deref()
        .is_some_and(|h| h.trim().is_empty())
    {
        return Err("reference_host must not be empty".into());
    }

    if cfg.ping_count == Some(0) {
        return Err("ping_count must be at least 1".into());
    }

    if cfg.interface.as_deref().is_some_and(|i| i.trim().is_empty()) {
        return Err("interface must not be empty when set".into());
    }

    // Latency grid
    if cfg.heatmap.hosts.is_empty() {
        return Err("heatmap.hosts must list at least one host".into());
    }
    if let Some(blank) = cfg.heatmap.hosts.iter().position(|h| h.trim().is_empty()) {
        return Err(format!("heatmap.hosts[{}] is empty", blank).into());
    }
    if cfg.heatmap.every_ticks == 0 {
        return Err("heatmap.every_ticks must be greater than zero".into());
    }
    if cfg.heatmap.ping_count == 0 {
        return Err("heatmap.ping_count must be at least 1".into());
    }
    let heatmap_interval_ms = cfg.heatmap.every_ticks.saturating_mul(tick_ms);
    if cfg.heatmap.history_seconds.saturating_mul(1000) < heatmap_interval_ms {
        return Err(format!(
            "heatmap.history_seconds ({}) is shorter than one heatmap interval ({} ms)",
            cfg.heatmap.history_seconds, heatmap_interval_ms
        )
        .into());
    }

    // Topology
    if cfg.topology.every_ticks == 0 {
        return Err("topology.every_ticks must be greater than zero".into());
    }
    if cfg.topology.max_hops == 0 {
        return Err("topology.max_hops must be at least 1".into());
    }

    // Benchmark
    if cfg.benchmark.enabled {
        if cfg.benchmark.download_url.trim().is_empty() {
            return Err("benchmark is enabled but benchmark.download_url is empty".into());
        }
        if cfg.benchmark.upload_url.trim().is_empty() {
            return Err("benchmark is enabled but benchmark.upload_url is empty".into());
        }
        if cfg.benchmark.interval_seconds == 0 {
            return Err("benchmark.interval_seconds must be greater than zero".into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(interface) = &args.interface {
        config.interface = Some(interface.clone());
    }
    if args.ipv6 {
        config.ipv6 = Some(true);
    }
    if let Some(ms) = args.tick_interval_ms {
        config.tick_interval_ms = Some(ms);
    }
    if let Some(host) = &args.reference_host {
        config.reference_host = Some(host.clone());
    }
    if let Some(count) = args.ping_count {
        config.ping_count = Some(count);
    }

    // Parse comma-separated heatmap hosts
    if let Some(hosts) = &args.heatmap_hosts {
        config.heatmap.hosts = hosts
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if args.enable_benchmark {
        config.benchmark.enabled = true;
    }

    Ok(config)
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/netpulse/netpulse.yaml",
            "/etc/netpulse/netpulse.yml",
            "/etc/netpulse/netpulse.json",
            "/etc/netpulse/netpulse.toml",
            "./netpulse.yaml",
            "./netpulse.yml",
            "./netpulse.json",
            "./netpulse.toml",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if !path.exists() || path.to_string_lossy().is_empty() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    parse_config(&content, path.extension().and_then(|s| s.to_str())).map(|config| {
        info!("Loaded configuration from: {}", path.display());
        config
    })
}

/// Parses config text; the extension picks the format, YAML otherwise.
pub fn parse_config(
    content: &str,
    extension: Option<&str>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(validate_effective_config(&config).is_ok());
        assert_eq!(config.port, Some(9310));
        assert_eq!(config.heatmap.hosts.len(), 3);
        assert_eq!(config.heatmap.ping_count, 2);
        assert_eq!(config.topology.every_ticks, 60);
        assert!(!config.benchmark.enabled);
    }

    #[test]
    fn test_rejects_zero_tick() {
        let config = Config {
            tick_interval_ms: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_reference_host() {
        let config = Config {
            reference_host: Some("  ".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_rejects_history_shorter_than_interval() {
        let mut config = Config::default();
        config.heatmap.every_ticks = 10;
        config.heatmap.history_seconds = 5;
        let err = validate_effective_config(&config).unwrap_err();
        assert!(err.to_string().contains("history_seconds"));
    }

    #[test]
    fn test_rejects_empty_heatmap_hosts() {
        let mut config = Config::default();
        config.heatmap.hosts.clear();
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_rejects_benchmark_without_urls() {
        let mut config = Config::default();
        config.benchmark.enabled = true;
        config.benchmark.upload_url = String::new();
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "port: 9999\nheatmap:\n  hosts: [\"10.0.0.1\"]\n";
        let config = parse_config(yaml, Some("yaml")).unwrap();
        assert_eq!(config.port, Some(9999));
        assert_eq!(config.heatmap.hosts, vec!["10.0.0.1".to_string()]);
        assert_eq!(config.heatmap.every_ticks, 10);
        assert_eq!(config.topology.max_hops, 30);
        assert_eq!(config.tick_interval_ms, None);
    }

    #[test]
    fn test_json_and_toml_parse() {
        let json = r#"{"reference_host": "1.1.1.1", "benchmark": {"enabled": true}}"#;
        let config = parse_config(json, Some("json")).unwrap();
        assert_eq!(config.reference_host.as_deref(), Some("1.1.1.1"));
        assert!(config.benchmark.enabled);
        assert_eq!(config.benchmark.interval_seconds, 60);

        let toml_text = "interface = \"wlan0\"\n[topology]\nmax_hops = 12\n";
        let config = parse_config(toml_text, Some("toml")).unwrap();
        assert_eq!(config.interface.as_deref(), Some("wlan0"));
        assert_eq!(config.topology.max_hops, 12);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config(Some("/nonexistent/netpulse.yaml")).unwrap();
        assert_eq!(config.port, Some(DEFAULT_PORT));
    }

    #[test]
    fn test_render_roundtrips_yaml() {
        let rendered = render_config(&Config::default(), ConfigFormat::Yaml).unwrap();
        let parsed = parse_config(&rendered, Some("yaml")).unwrap();
        assert_eq!(parsed.port, Some(DEFAULT_PORT));
        assert_eq!(parsed.heatmap.hosts.len(), 3);
    }
}
