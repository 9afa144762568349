//! Throughput benchmark running on its own cadence.
//!
//! A full download/upload saturation test takes several seconds, so it runs
//! on a dedicated task and publishes its latest successful result through a
//! `watch` cell. Sampler ticks read the cell without ever waiting on a run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ProbeError;
use crate::health_stats::HealthStats;
use crate::probe::command::run_with_deadline;

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Result of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub download_mbps: f64,
    /// `None` when the upload leg failed but the download succeeded.
    pub upload_mbps: Option<f64>,
    pub duration_secs: f64,
    pub completed_at: DateTime<Utc>,
}

/// Saturation benchmark executor.
#[async_trait]
pub trait ThroughputBenchmark: Send + Sync {
    /// Runs one benchmark; `None` when the download leg failed.
    async fn run(&self) -> Option<BenchmarkResult>;
}

/// Converts curl's `%{speed_*}` output (bytes per second) to Mbps.
pub fn parse_curl_speed(output: &str) -> Result<f64, ProbeError> {
    let raw = output.trim();
    raw.replace(',', ".")
        .parse::<f64>()
        .map(|bytes_per_sec| bytes_per_sec * 8.0 / 1_000_000.0)
        .map_err(|_| ProbeError::ParseFailure {
            tool: "curl".to_string(),
            detail: format!("unexpected speed value '{}'", raw),
        })
}

/// Benchmark backed by the `curl` tool.
#[derive(Debug, Clone)]
pub struct CurlBenchmark {
    pub curl_program: String,
    pub download_url: String,
    pub upload_url: String,
    pub upload_bytes: usize,
    pub timeout: Duration,
}

impl CurlBenchmark {
    pub fn new(download_url: String, upload_url: String, upload_bytes: usize, timeout: Duration) -> Self {
        Self {
            curl_program: "curl".to_string(),
            download_url,
            upload_url,
            upload_bytes,
            timeout,
        }
    }

    async fn download(&self) -> Result<f64, ProbeError> {
        let args = vec![
            "-s".to_string(),
            "-o".to_string(),
            "/dev/null".to_string(),
            "--max-time".to_string(),
            self.timeout.as_secs().max(1).to_string(),
            "-w".to_string(),
            "%{speed_download}".to_string(),
            self.download_url.clone(),
        ];
        let output = run_with_deadline(
            &self.curl_program,
            &args,
            self.timeout + Duration::from_secs(1),
        )
        .await?;
        parse_curl_speed(&output)
    }

    async fn upload(&self) -> Result<f64, ProbeError> {
        let start = Instant::now();
        let unavailable = |reason: String| ProbeError::Unavailable {
            tool: self.curl_program.clone(),
            reason,
        };

        let max_time = self.timeout.as_secs().max(1).to_string();
        let mut child = Command::new(&self.curl_program)
            .args([
                "-s",
                "-o",
                "/dev/null",
                "--max-time",
                max_time.as_str(),
                "-w",
                "%{speed_upload}",
                "--data-binary",
                "@-",
                self.upload_url.as_str(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| unavailable(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            let total = self.upload_bytes;
            tokio::spawn(async move {
                let chunk = vec![0u8; UPLOAD_CHUNK_BYTES];
                let mut written = 0;
                while written < total {
                    let n = UPLOAD_CHUNK_BYTES.min(total - written);
                    if stdin.write_all(&chunk[..n]).await.is_err() {
                        break;
                    }
                    written += n;
                }
                // Dropping stdin closes the pipe and ends the request body.
            });
        }

        let deadline = self.timeout + Duration::from_secs(1);
        let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(unavailable(e.to_string())),
            Err(_) => {
                return Err(ProbeError::TimedOut {
                    tool: self.curl_program.clone(),
                    elapsed: start.elapsed(),
                })
            }
        };

        if !output.status.success() {
            return Err(ProbeError::NonZeroExit {
                tool: self.curl_program.clone(),
                code: output.status.code(),
            });
        }
        parse_curl_speed(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl ThroughputBenchmark for CurlBenchmark {
    async fn run(&self) -> Option<BenchmarkResult> {
        let start = Instant::now();

        let download_mbps = match self.download().await {
            Ok(mbps) => mbps,
            Err(e) => {
                warn!("Download benchmark failed: {}", e);
                return None;
            }
        };

        let upload_mbps = match self.upload().await {
            Ok(mbps) => Some(mbps),
            Err(e) => {
                warn!("Upload benchmark failed: {}", e);
                None
            }
        };

        Some(BenchmarkResult {
            download_mbps,
            upload_mbps,
            duration_secs: start.elapsed().as_secs_f64(),
            completed_at: Utc::now(),
        })
    }
}

/// Spawns the benchmark loop and returns the cell its results land in.
///
/// The first run starts immediately. A failed run leaves the previous result
/// in place. The loop exits when `shutdown` flips to `true`.
pub fn spawn_benchmark_task(
    benchmark: Arc<dyn ThroughputBenchmark>,
    interval: Duration,
    health_stats: Arc<HealthStats>,
    mut shutdown: watch::Receiver<bool>,
) -> (watch::Receiver<Option<BenchmarkResult>>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            debug!("Starting throughput benchmark");
            match benchmark.run().await {
                Some(result) => {
                    info!(
                        "Throughput benchmark: down {:.2} Mbps, up {} in {:.1}s",
                        result.download_mbps,
                        result
                            .upload_mbps
                            .map(|u| format!("{:.2} Mbps", u))
                            .unwrap_or_else(|| "n/a".to_string()),
                        result.duration_secs
                    );
                    health_stats.record_benchmark_run(true);
                    tx.send_replace(Some(result));
                }
                None => {
                    health_stats.record_benchmark_run(false);
                }
            }
        }

        debug!("Benchmark task stopped");
    });

    (rx, handle)
}
