// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # aerie-edge
//!
//! Drone edge aggregator binary.
//!
//! ## Usage
//!
//! ```bash
//! # Stock ports: sensors on 8888, central at 127.0.0.1:6000
//! aerie-edge --edge-id drone1
//!
//! # Faster reporting against a remote registry
//! aerie-edge --edge-id drone2 --central-addr 10.0.0.2:6000 --report-interval 2
//! ```

use aerie_edge::{EdgeConfig, EdgeNode};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// AERIE drone edge aggregator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Identifier this node reports under
    #[arg(long, default_value = "drone1")]
    edge_id: String,

    /// Address the sensor-facing listener binds
    #[arg(long, default_value = "0.0.0.0:8888")]
    listen_addr: String,

    /// Address of the central registry
    #[arg(long, default_value = "127.0.0.1:6000")]
    central_addr: String,

    /// Seconds between aggregate reports
    #[arg(long, default_value = "5")]
    report_interval: u64,

    /// Seconds between battery ticks
    #[arg(long, default_value = "10")]
    battery_tick_interval: u64,

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

    info!("AERIE Edge v{}", env!("CARGO_PKG_VERSION"));

    let config = EdgeConfig::new(args.edge_id)
        .with_listen_addr(args.listen_addr)
        .with_central_addr(args.central_addr)
        .with_report_interval(Duration::from_secs(args.report_interval))
        .with_battery_tick_interval(Duration::from_secs(args.battery_tick_interval));

    let node = match EdgeNode::bind(config).await {
        Ok(node) => node,
        Err(err) => {
            error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };

    if let Err(err) = node.run().await {
        error!(error = %err, "edge node terminated");
        std::process::exit(1);
    }
}
