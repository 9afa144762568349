//! Check command implementation.
//!
//! Validates probe tools, interface detection and configuration.

use netpulse::{CounterSource, ProcNetDev};

use crate::config::{validate_effective_config, Config};
use crate::startup_checks::{check_net_dev_access, locate_tool, BENCHMARK_TOOL, PROBE_TOOLS};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 netpulse - System Check");
    println!("==========================");

    let mut all_ok = true;

    println!("\n🛠️  Checking probe tools...");
    for tool in PROBE_TOOLS {
        match locate_tool(tool) {
            Ok(path) => println!("   ✅ {} -> {}", tool, path.display()),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }
    match locate_tool(BENCHMARK_TOOL) {
        Ok(path) => println!("   ✅ {} -> {}", BENCHMARK_TOOL, path.display()),
        Err(e) if config.benchmark.enabled => {
            println!("   ❌ {} (benchmark is enabled)", e);
            all_ok = false;
        }
        Err(e) => println!("   ⚠️  {} (only needed for the benchmark)", e),
    }

    println!("\n📡 Checking interface counters...");
    let source = ProcNetDev::default();
    if let Err(e) = check_net_dev_access(source.net_dev_path()) {
        println!("   ❌ {}", e);
        all_ok = false;
    } else {
        println!("   ✅ {} readable", source.net_dev_path().display());
    }

    let interface = match &config.interface {
        Some(name) => {
            println!("   ℹ️  Interface configured: {}", name);
            Some(name.clone())
        }
        None => match source.default_interface() {
            Ok(name) => {
                println!("   ✅ Default interface resolved: {}", name);
                Some(name)
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
                None
            }
        },
    };

    if let Some(name) = interface {
        match source.counters(&name) {
            Ok(snapshot) => println!(
                "   ✅ Counters for {}: {} bytes sent, {} bytes received",
                name, snapshot.bytes_sent, snapshot.bytes_recv
            ),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
