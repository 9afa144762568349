//! Startup requirement validation for netpulse.
//!
//! This module checks that the external probe tools are installed and that
//! interface counters are readable before the sampler starts. Nothing here
//! aborts startup: a missing tool only means the matching probe reports no
//! result.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Tools used by the reachability and topology probes.
pub const PROBE_TOOLS: &[&str] = &["ping", "traceroute"];

/// Tool used by the throughput benchmark.
pub const BENCHMARK_TOOL: &str = "curl";

/// Validate all runtime requirements
pub fn validate_requirements(net_dev_path: &Path, benchmark_enabled: bool) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    let mut tools: Vec<&str> = PROBE_TOOLS.to_vec();
    if benchmark_enabled {
        tools.push(BENCHMARK_TOOL);
    }

    let missing: Vec<String> = tools
        .iter()
        .filter_map(|tool| match locate_tool(tool) {
            Ok(path) => {
                info!("✅ {} found at {}", tool, path.display());
                None
            }
            Err(e) => {
                warn!("⚠️  {} - related probes will report no data", e);
                Some(tool.to_string())
            }
        })
        .collect();

    check_net_dev_access(net_dev_path)?;

    if !missing.is_empty() {
        return Err(ValidationError::ToolsMissing(missing.join(", ")));
    }

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Resolves a tool on PATH.
pub fn locate_tool(name: &str) -> Result<PathBuf, ValidationError> {
    which::which(name).map_err(|e| {
        debug!("Lookup of {} failed: {}", name, e);
        ValidationError::ToolNotFound(name.to_string())
    })
}

/// Check that interface counters can be read
pub fn check_net_dev_access(path: &Path) -> Result<(), ValidationError> {
    match fs::read_to_string(path) {
        Ok(content) if content.lines().count() > 2 => {
            info!("✅ {} readable", path.display());
            Ok(())
        }
        Ok(_) => {
            warn!("⚠️  {} lists no interfaces", path.display());
            Ok(())
        }
        Err(e) => {
            error!("❌ Cannot read {}: {}", path.display(), e);
            error!("   Throughput sampling will fail every tick!");
            Err(ValidationError::CountersUnreadable(format!(
                "{}: {}",
                path.display(),
                e
            )))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} not found on PATH")]
    ToolNotFound(String),

    #[error("Probe tools missing: {0}")]
    ToolsMissing(String),

    #[error("Interface counters not readable: {0}")]
    CountersUnreadable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_locate_missing_tool() {
        let err = locate_tool("netpulse-no-such-tool").unwrap_err();
        assert!(matches!(err, ValidationError::ToolNotFound(_)));
        assert!(err.to_string().contains("netpulse-no-such-tool"));
    }

    #[test]
    fn test_net_dev_access() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Inter-|   Receive").unwrap();
        writeln!(file, " face |bytes").unwrap();
        writeln!(file, "  eth0: 1 2 0 0 0 0 0 0 3 4 0 0 0 0 0 0").unwrap();
        assert!(check_net_dev_access(file.path()).is_ok());

        let missing = Path::new("/nonexistent/net/dev");
        assert!(matches!(
            check_net_dev_access(missing),
            Err(ValidationError::CountersUnreadable(_))
        ));
    }
}
