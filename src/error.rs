//! Error types for the sampling core.
//!
//! Probe errors never leave the probe layer: they are logged and collapsed
//! into an absent measurement at the trait boundary. Counter errors surface
//! to the tick, which records them as a failed tick.

use std::time::Duration;

/// Failure modes of an external probe invocation.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe tool '{tool}' unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("probe tool '{tool}' timed out after {elapsed:?}")]
    TimedOut { tool: String, elapsed: Duration },

    #[error("probe tool '{tool}' exited with status {code:?}")]
    NonZeroExit { tool: String, code: Option<i32> },

    #[error("unrecognized output from '{tool}': {detail}")]
    ParseFailure { tool: String, detail: String },
}

/// Failure modes of the interface counter source.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("interface {0} not found")]
    InterfaceNotFound(String),

    #[error("no active non-loopback network interface found")]
    NoActiveInterface,

    #[error("malformed counter line for {interface}: {line}")]
    Malformed { interface: String, line: String },
}
