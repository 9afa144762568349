//! CLI command implementations for netpulse.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Probe tool and interface validation
//! - `probe`: One-shot reachability and path probe
//! - `interfaces`: Interface listing with counters

pub mod check;
pub mod interfaces;
pub mod probe;

// Re-export command functions
pub use check::command_check;
pub use interfaces::command_interfaces;
pub use probe::command_probe;
