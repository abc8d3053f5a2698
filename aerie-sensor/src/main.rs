// AERIE Sensor - Leaf sensor simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # aerie-sensor
//!
//! Simulated environmental sensor streaming readings to an edge node.
//!
//! ## Usage
//!
//! ```bash
//! # Stock settings: one reading every 5s, 1-in-20 anomaly odds
//! aerie-sensor --sensor-id sensor1
//!
//! # Aggressive anomaly injection against a remote edge node
//! aerie-sensor --drone-addr 10.0.0.7:8888 --sensor-id sensor2 --anomaly-frequency 4
//! ```

use aerie_sensor::{SensorConfig, SensorNode};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// AERIE leaf sensor simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address of the drone edge node
    #[arg(long, default_value = "127.0.0.1:8888")]
    drone_addr: String,

    /// Unique identifier for this sensor
    #[arg(long, default_value = "sensor1")]
    sensor_id: String,

    /// Seconds between transmissions
    #[arg(long, default_value = "5")]
    interval: u64,

    /// 1-in-N chance to emit an anomalous reading
    #[arg(long, default_value = "20")]
    anomaly_frequency: u32,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

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

    info!("AERIE Sensor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = SensorConfig::new(args.drone_addr, args.sensor_id)
        .with_interval(Duration::from_secs(args.interval))
        .with_anomaly_frequency(args.anomaly_frequency);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let node = match SensorNode::new(config) {
        Ok(node) => node,
        Err(err) => {
            error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };

    if let Err(err) = node.run().await {
        error!(error = %err, "sensor node terminated");
        std::process::exit(1);
    }
}
