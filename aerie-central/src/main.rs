// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # aerie-central
//!
//! Central monitoring registry binary.
//!
//! ## Usage
//!
//! ```bash
//! # Stock port 6000, 15s liveness timeout
//! aerie-central
//!
//! # Custom port and tighter liveness
//! aerie-central --listen-addr 0.0.0.0:7000 --liveness-timeout 10
//! ```

use aerie_central::{CentralConfig, CentralNode};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// AERIE central monitoring registry
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the edge-facing listener binds
    #[arg(long, default_value = "0.0.0.0:6000")]
    listen_addr: String,

    /// Seconds of silence before a drone record is flagged stale
    #[arg(long, default_value = "15")]
    liveness_timeout: u64,

    /// Seconds between liveness sweeps
    #[arg(long, default_value = "5")]
    sweep_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("AERIE Central v{}", env!("CARGO_PKG_VERSION"));

    let config = CentralConfig::new()
        .with_listen_addr(args.listen_addr)
        .with_liveness_timeout(Duration::from_secs(args.liveness_timeout))
        .with_sweep_interval(Duration::from_secs(args.sweep_interval));

    let node = match CentralNode::bind(config).await {
        Ok(node) => node,
        Err(err) => {
            error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };

    if let Err(err) = node.run().await {
        error!(error = %err, "central registry terminated");
        std::process::exit(1);
    }
}
