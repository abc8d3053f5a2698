// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AERIE Central - Monitoring registry
//!
//! Accepts connections from many edge nodes, keeps one [`DroneRecord`]
//! per edge id, and appends every received [`AnomalyEvent`] to an
//! append-only ledger. A periodic sweeper flags records that stop
//! reporting; stale records stay visible for audit.
//!
//! Presentation consumers read the registry through the cloneable
//! [`RegistryHandle`]: point-in-time snapshots via [`RegistryHandle::view`],
//! ledger access, and a `tokio::sync::watch` subscription that
//! republishes the view after every applied report and sweep.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aerie_central::{CentralConfig, CentralNode};
//!
//! # async fn run() -> aerie_central::Result<()> {
//! let node = CentralNode::bind(CentralConfig::default()).await?;
//! let handle = node.handle();
//!
//! // A dashboard would subscribe instead of polling
//! let mut updates = handle.subscribe();
//! tokio::spawn(async move {
//!     while updates.changed().await.is_ok() {
//!         let view = updates.borrow().clone();
//!         println!("{} drones known", view.drones.len());
//!     }
//! });
//!
//! node.run().await
//! # }
//! ```

mod config;
mod error;
mod registry;
mod server;

// Public API
pub use config::CentralConfig;
pub use error::{CentralError, Result};
pub use registry::{
    DroneRecord, DroneStatus, HistoryPoint, LedgerStats, Registry, RegistryStats, RegistryView,
};

use aerie::protocol::AnomalyEvent;
use chrono::{Duration as ChronoDuration, Utc};
use server::lock_registry;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};
use tracing::info;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The central monitoring registry
pub struct CentralNode {
    config: CentralConfig,
    registry: Arc<Mutex<Registry>>,
    watch_tx: Arc<watch::Sender<RegistryView>>,
    listener: TcpListener,
}

impl CentralNode {
    /// Validate the configuration and bind the edge-facing listener
    pub async fn bind(config: CentralConfig) -> Result<Self> {
        config.validate().map_err(CentralError::InvalidConfig)?;

        let listener =
            TcpListener::bind(&config.listen_addr)
                .await
                .map_err(|source| CentralError::Bind {
                    addr: config.listen_addr.clone(),
                    source,
                })?;

        let registry = Arc::new(Mutex::new(Registry::new(config.history_cap)));
        let (watch_tx, _) = watch::channel(RegistryView::default());

        Ok(Self {
            config,
            registry,
            watch_tx: Arc::new(watch_tx),
            listener,
        })
    }

    /// Address the listener actually bound (useful with port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Read-only surface for presentation consumers
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            registry: self.registry.clone(),
            watch_tx: self.watch_tx.clone(),
        }
    }

    /// Run the registry forever
    pub async fn run(self) -> Result<()> {
        info!(
            listen_addr = %self.config.listen_addr,
            liveness_timeout_secs = self.config.liveness_timeout.as_secs(),
            "central registry starting"
        );

        let listener_task =
            server::run_listener(self.listener, self.registry.clone(), self.watch_tx.clone());
        let sweeper_task = run_sweeper(self.config.clone(), self.registry, self.watch_tx);

        tokio::join!(listener_task, sweeper_task);
        Ok(())
    }
}

/// Periodic liveness sweep
async fn run_sweeper(
    config: CentralConfig,
    registry: Arc<Mutex<Registry>>,
    watch_tx: Arc<watch::Sender<RegistryView>>,
) {
    let mut ticker = interval_at(
        Instant::now() + config.sweep_interval,
        config.sweep_interval,
    );
    let timeout = ChronoDuration::from_std(config.liveness_timeout)
        .unwrap_or_else(|_| ChronoDuration::seconds(15));

    loop {
        ticker.tick().await;
        let (newly_stale, view) = {
            let mut registry = lock_registry(&registry);
            let stale = registry.sweep(Utc::now(), timeout);
            (stale, registry.view())
        };
        if !newly_stale.is_empty() {
            watch_tx.send_replace(view);
        }
    }
}

/// Cloneable read-only query surface over a running registry
///
/// Reads always reflect the latest fully applied report or sweep, never
/// a partially-applied one.
#[derive(Clone)]
pub struct RegistryHandle {
    registry: Arc<Mutex<Registry>>,
    watch_tx: Arc<watch::Sender<RegistryView>>,
}

impl RegistryHandle {
    /// Consistent snapshot of the whole registry
    pub fn view(&self) -> RegistryView {
        lock_registry(&self.registry).view()
    }

    /// Clone one drone's record
    pub fn drone(&self, edge_id: &str) -> Option<DroneRecord> {
        lock_registry(&self.registry).drone(edge_id).cloned()
    }

    /// The most recent `n` ledger entries, oldest first
    pub fn ledger_tail(&self, n: usize) -> Vec<AnomalyEvent> {
        lock_registry(&self.registry).ledger_tail(n).to_vec()
    }

    /// Ledger breakdown by metric
    pub fn ledger_stats(&self) -> LedgerStats {
        lock_registry(&self.registry).ledger_stats()
    }

    /// Operational counters
    pub fn stats(&self) -> RegistryStats {
        lock_registry(&self.registry).stats()
    }

    /// Subscribe to view updates
    ///
    /// The receiver yields a fresh [`RegistryView`] after every applied
    /// report and every sweep that flagged a record.
    pub fn subscribe(&self) -> watch::Receiver<RegistryView> {
        self.watch_tx.subscribe()
    }
}
