// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AERIE Edge - Drone edge aggregator
//!
//! Terminates many concurrent sensor connections, classifies readings
//! against configured normal ranges, runs the battery-driven flight
//! state machine, and relays periodic [`AggregateReport`]s to the
//! central registry over a self-healing uplink.
//!
//! ## Overview
//!
//! ```text
//! sensors ──TCP──> ┌──────────────────────────────┐
//! sensors ──TCP──> │  EdgeNode                    │
//! control ──TCP──> │  ┌────────────────────────┐  │
//!                  │  │ EdgeState (one mutex)  │  │
//!                  │  │  battery machine       │  │
//!                  │  │  sensor table          │  │
//!                  │  │  anomaly buffer        │  │
//!                  │  └────────────────────────┘  │
//!                  │   timer task    uplink task  │──TCP──> central
//!                  └──────────────────────────────┘
//! ```
//!
//! One tokio task per connection, one timer task driving battery ticks
//! and report emission, one uplink task draining the bounded report
//! queue. All of them touch the state through short, await-free
//! critical sections.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aerie_edge::{EdgeConfig, EdgeNode};
//!
//! # async fn run() -> aerie_edge::Result<()> {
//! let config = EdgeConfig::new("drone1")
//!     .with_listen_addr("0.0.0.0:8888")
//!     .with_central_addr("127.0.0.1:6000");
//!
//! let node = EdgeNode::bind(config).await?;
//! let _handle = node.handle(); // read-only surface for dashboards
//! node.run().await
//! # }
//! ```

mod aggregator;
mod config;
mod error;
mod sensors;
mod server;
mod uplink;

// Public API
pub use aggregator::{EdgeSnapshot, EdgeState, EdgeStats};
pub use config::EdgeConfig;
pub use error::{EdgeError, Result};
pub use sensors::{SensorChannel, SensorTable};
pub use uplink::ReportQueue;

use aerie::protocol::{AggregateReport, BatteryState};
use aggregator::lock_state;
use chrono::{Duration as ChronoDuration, Utc};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::time::{interval_at, Instant};
use tracing::{info, warn};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One drone-mounted edge aggregator
pub struct EdgeNode {
    config: EdgeConfig,
    state: Arc<Mutex<EdgeState>>,
    queue: Arc<ReportQueue>,
    listener: TcpListener,
}

impl EdgeNode {
    /// Validate the configuration and bind the sensor-facing listener
    ///
    /// Binding is the only fallible part of startup; everything after
    /// `run` recovers in place.
    pub async fn bind(config: EdgeConfig) -> Result<Self> {
        config.validate().map_err(EdgeError::InvalidConfig)?;

        let listener =
            TcpListener::bind(&config.listen_addr)
                .await
                .map_err(|source| EdgeError::Bind {
                    addr: config.listen_addr.clone(),
                    source,
                })?;

        let state = Arc::new(Mutex::new(EdgeState::new(&config)));
        let queue = Arc::new(ReportQueue::new(config.uplink_queue_limit));

        Ok(Self {
            config,
            state,
            queue,
            listener,
        })
    }

    /// Address the listener actually bound (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Read-only surface for presentation consumers
    pub fn handle(&self) -> EdgeHandle {
        EdgeHandle {
            state: self.state.clone(),
        }
    }

    /// Run the node forever
    pub async fn run(self) -> Result<()> {
        info!(
            edge_id = %self.config.edge_id,
            listen_addr = %self.config.listen_addr,
            central_addr = %self.config.central_addr,
            "edge node starting"
        );

        let listener_task = server::run_sensor_listener(self.listener, self.state.clone());
        let timer_task = run_timers(self.config.clone(), self.state.clone(), self.queue.clone());
        let uplink_task = uplink::run_uplink(
            self.config.central_addr.clone(),
            self.config.uplink_retry.clone(),
            self.queue.clone(),
        );

        tokio::join!(listener_task, timer_task, uplink_task);
        Ok(())
    }
}

/// Battery ticks and report emission, one task for both timers
async fn run_timers(config: EdgeConfig, state: Arc<Mutex<EdgeState>>, queue: Arc<ReportQueue>) {
    // Start both timers one period out; an immediate first tick would
    // drain the battery and emit an empty report at t=0.
    let mut battery_ticker = interval_at(
        Instant::now() + config.battery_tick_interval,
        config.battery_tick_interval,
    );
    let mut report_ticker = interval_at(
        Instant::now() + config.report_interval,
        config.report_interval,
    );

    let grace = ChronoDuration::from_std(config.sensor_grace)
        .unwrap_or_else(|_| ChronoDuration::seconds(60));

    loop {
        tokio::select! {
            _ = battery_ticker.tick() => {
                lock_state(&state).battery_tick();
            }
            _ = report_ticker.tick() => {
                let now = Utc::now();
                let report = {
                    let mut state = lock_state(&state);
                    state.sweep_stale(now, grace);
                    state.build_report(now)
                };
                if queue.push(report) > 0 {
                    warn!("uplink queue full, dropped oldest report");
                }
            }
        }
    }
}

/// Cloneable read-only query surface over a running edge node
///
/// Reads always reflect the latest fully applied reading, command, or
/// tick, never a partial update.
#[derive(Clone)]
pub struct EdgeHandle {
    state: Arc<Mutex<EdgeState>>,
}

impl EdgeHandle {
    /// Consistent snapshot of the node
    pub fn snapshot(&self) -> EdgeSnapshot {
        lock_state(&self.state).snapshot()
    }

    /// Current battery state
    pub fn battery(&self) -> BatteryState {
        lock_state(&self.state).battery()
    }

    /// Operational counters
    pub fn stats(&self) -> EdgeStats {
        lock_state(&self.state).stats()
    }

    /// Assemble a report out-of-band, draining the anomaly buffer
    ///
    /// Exists for tests and embedders; the timer task is the normal
    /// producer.
    pub fn build_report_now(&self) -> AggregateReport {
        lock_state(&self.state).build_report(Utc::now())
    }
}
