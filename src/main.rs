//! netpulse - version 0.1.0
//!
//! Continuous network path sampler with tracing logging.
//! This is the main entry point that starts the sampler and HTTP server and
//! handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod metrics;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use clap::Parser;
use netpulse::{
    spawn_benchmark_task, AddressFamily, CounterSource, CurlBenchmark, HealthStats, LatencyMatrix,
    ProcNetDev, Probes, Sampler, SamplerSettings, SnapshotStore, SystemPing, SystemTraceroute,
    MAX_SAMPLES,
};
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_interfaces, command_probe};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT, DEFAULT_REFERENCE_HOST, DEFAULT_TICK_INTERVAL_MS,
};
use handlers::{
    config_handler, health_handler, metrics_handler, root_handler, snapshot_handler,
    totals_handler,
};
use metrics::SamplerMetrics;
use state::AppState;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match args.log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", args.log_level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Builds sampler settings from the effective config.
fn sampler_settings(config: &Config, interface: String) -> SamplerSettings {
    SamplerSettings {
        tick_interval: Duration::from_millis(
            config.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS),
        ),
        interface,
        reference_host: config
            .reference_host
            .clone()
            .unwrap_or_else(|| DEFAULT_REFERENCE_HOST.to_string()),
        family: AddressFamily::from_ipv6_flag(config.ipv6.unwrap_or(false)),
        ping_count: config.ping_count.unwrap_or(1),
        ping_timeout: Duration::from_secs(config.ping_timeout_secs.unwrap_or(1)),
        heatmap_every_ticks: config.heatmap.every_ticks,
        topology_every_ticks: config.topology.every_ticks,
        topology_max_hops: config.topology.max_hops,
        topology_hop_timeout: Duration::from_secs(config.topology.hop_timeout_secs),
        history_capacity: MAX_SAMPLES,
    }
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        setup_logging(&args)?;

        match command {
            Commands::Check => {
                // Check reports config problems itself instead of exiting early
                let config = resolve_config(&args)?;
                command_check(&config)?;
            }
            Commands::Probe { host, trace, count } => {
                let config = load_validated_config(&args)?;
                command_probe(host, *trace, *count, &config).await?;
            }
            Commands::Interfaces => command_interfaces()?,
        }
        return Ok(());
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&args)?;

    info!("Starting netpulse");

    let counters = Arc::new(ProcNetDev::default());

    if let Err(e) = startup_checks::validate_requirements(
        counters.net_dev_path(),
        config.benchmark.enabled,
    ) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The sampler will start but some measurements will be missing!");
        // Continue anyway - don't fail hard
    }

    let interface = match &config.interface {
        Some(name) => name.clone(),
        None => {
            let name = counters.default_interface()?;
            info!("Sampling default interface {}", name);
            name
        }
    };

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    let settings = sampler_settings(&config, interface);
    let heatmap_interval = settings.tick_interval * config.heatmap.every_ticks as u32;
    let matrix = LatencyMatrix::with_window(
        config.heatmap.hosts.clone(),
        Duration::from_secs(config.heatmap.history_seconds),
        heatmap_interval,
    )
    .with_probe_params(
        config.heatmap.ping_count,
        settings.ping_timeout,
        settings.family,
    );
    info!(
        "Latency grid: {} hosts x {} slots, refreshed every {:?}",
        matrix.hosts().len(),
        matrix.slot_count(),
        heatmap_interval
    );

    let health_stats = Arc::new(HealthStats::new());
    let store = Arc::new(SnapshotStore::new());
    let probes = Probes {
        reachability: Arc::new(SystemPing::new()),
        path: Arc::new(SystemTraceroute::with_deadline(Duration::from_secs(
            config.topology.deadline_secs,
        ))),
        counters,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut sampler = Sampler::new(
        settings,
        probes,
        matrix,
        Arc::clone(&health_stats),
        Arc::clone(&store),
    );

    let benchmark_task = if config.benchmark.enabled {
        let bench = &config.benchmark;
        info!(
            "Throughput benchmark enabled every {}s against {}",
            bench.interval_seconds, bench.download_url
        );
        let benchmark = Arc::new(CurlBenchmark::new(
            bench.download_url.clone(),
            bench.upload_url.clone(),
            bench.upload_bytes,
            Duration::from_secs(bench.timeout_secs),
        ));
        let (results, handle) = spawn_benchmark_task(
            benchmark,
            Duration::from_secs(bench.interval_seconds),
            Arc::clone(&health_stats),
            shutdown_rx.clone(),
        );
        sampler = sampler.with_benchmark(results);
        Some(handle)
    } else {
        debug!("Throughput benchmark disabled in configuration");
        None
    };

    let handle = sampler.handle();
    let sampler_task = tokio::spawn(sampler.run(shutdown_rx));

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = SamplerMetrics::new(&registry)?;
    debug!("All metrics registered successfully");

    let state = Arc::new(AppState {
        registry,
        metrics,
        sampler: handle,
        config: Arc::new(config.clone()),
        health_stats,
        start_time: Instant::now(),
    });

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/totals", get(totals_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/config", get(config_handler))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!("netpulse listening on http://{}:{}", bind_ip_str, port);

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let served = server.await;

    // Stop background tasks whether the server exited cleanly or not
    let _ = shutdown_tx.send(true);
    if let Err(e) = sampler_task.await {
        warn!("Sampler task ended abnormally: {}", e);
    }
    if let Some(task) = benchmark_task {
        task.abort();
    }

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("netpulse stopped gracefully");
    Ok(())
}
