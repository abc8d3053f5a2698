// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Drone directory and anomaly ledger
//!
//! One [`DroneRecord`] per reporting edge node, updated last-write-wins
//! from each [`AggregateReport`], plus an append-only [`AnomalyEvent`]
//! ledger in arrival order. Records silent past the liveness timeout are
//! flagged stale but stay visible for audit; only the flag changes.

use aerie::error::StaleSourceError;
use aerie::protocol::{AggregateReport, AnomalyEvent, BatteryState, Metric, Reading};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

/// One point of per-report averaged history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    /// When the edge assembled the report
    pub sent_at: DateTime<Utc>,
    /// Mean temperature across the edge's connected sensors
    pub avg_temperature: Option<f64>,
    /// Mean humidity across the edge's connected sensors
    pub avg_humidity: Option<f64>,
}

/// Registry entry for one edge node
#[derive(Debug, Clone)]
pub struct DroneRecord {
    /// The edge's id
    pub edge_id: String,
    /// Battery state from the latest report
    pub battery: BatteryState,
    /// Sensor snapshot from the latest report
    pub sensors: HashMap<String, Reading>,
    /// Local arrival time of the latest report
    pub last_update: DateTime<Utc>,
    /// False once the edge has been silent past the liveness timeout
    pub live: bool,
    /// Reports received from this edge
    pub reports_received: u64,
    /// Bounded ring of averaged history, oldest first
    pub history: VecDeque<HistoryPoint>,
}

/// Per-metric breakdown of the ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// All events ever recorded
    pub total: usize,
    /// Temperature violations
    pub temperature: usize,
    /// Humidity violations
    pub humidity: usize,
}

/// Operational counters for the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryStats {
    /// Reports accepted
    pub reports_received: u64,
    /// Frames dropped at the decode boundary
    pub decode_failures: u64,
    /// Anomaly events appended to the ledger
    pub anomalies_recorded: u64,
}

/// Summary row for one drone in a [`RegistryView`]
#[derive(Debug, Clone)]
pub struct DroneStatus {
    /// The edge's id
    pub edge_id: String,
    /// Battery state from the latest report
    pub battery: BatteryState,
    /// Liveness flag
    pub live: bool,
    /// Sensors in the latest snapshot
    pub sensor_count: usize,
    /// Local arrival time of the latest report
    pub last_update: DateTime<Utc>,
}

/// Consistent read-only view of the whole registry
#[derive(Debug, Clone, Default)]
pub struct RegistryView {
    /// One row per known drone, sorted by id
    pub drones: Vec<DroneStatus>,
    /// Ledger breakdown
    pub ledger: LedgerStats,
    /// Counters at view time
    pub stats: RegistryStats,
}

/// Multi-drone bookkeeping state
#[derive(Debug)]
pub struct Registry {
    drones: HashMap<String, DroneRecord>,
    ledger: Vec<AnomalyEvent>,
    stats: RegistryStats,
    history_cap: usize,
}

impl Registry {
    /// Create an empty registry
    pub fn new(history_cap: usize) -> Self {
        Self {
            drones: HashMap::new(),
            ledger: Vec::new(),
            stats: RegistryStats::default(),
            history_cap,
        }
    }

    /// Apply one report
    ///
    /// Record fields are replaced last-write-wins, the report's anomaly
    /// list is appended to the ledger in arrival order, and the record
    /// is marked live again whatever the sweeper said before.
    pub fn apply_report(&mut self, report: AggregateReport, now: DateTime<Utc>) {
        self.stats.reports_received += 1;

        let AggregateReport {
            edge_id,
            battery,
            sensors,
            anomalies,
            avg_temperature,
            avg_humidity,
            sent_at,
        } = report;

        if !self.drones.contains_key(&edge_id) {
            info!(edge_id = %edge_id, "new drone registered");
        }

        let record = self
            .drones
            .entry(edge_id.clone())
            .or_insert_with(|| DroneRecord {
                edge_id: edge_id.clone(),
                battery,
                sensors: HashMap::new(),
                last_update: now,
                live: true,
                reports_received: 0,
                history: VecDeque::new(),
            });

        record.battery = battery;
        record.sensors = sensors;
        record.last_update = now;
        record.live = true;
        record.reports_received += 1;

        if record.history.len() >= self.history_cap {
            record.history.pop_front();
        }
        record.history.push_back(HistoryPoint {
            sent_at,
            avg_temperature,
            avg_humidity,
        });

        for event in anomalies {
            warn!(
                edge_id = %event.edge_id,
                sensor_id = %event.sensor_id,
                metric = %event.metric,
                value = event.value,
                "anomaly recorded"
            );
            self.stats.anomalies_recorded += 1;
            self.ledger.push(event);
        }
    }

    /// Flag records silent past the timeout
    ///
    /// Returns the ids that flipped to stale on this sweep. Stale
    /// records keep every field; only `live` changes.
    pub fn sweep(&mut self, now: DateTime<Utc>, timeout: Duration) -> Vec<String> {
        let mut newly_stale = Vec::new();
        for (edge_id, record) in &mut self.drones {
            if record.live && now - record.last_update > timeout {
                record.live = false;
                let err = StaleSourceError {
                    source_id: edge_id.clone(),
                    silent_for_secs: (now - record.last_update).num_seconds().max(0) as u64,
                    limit_secs: timeout.num_seconds().max(0) as u64,
                };
                warn!(error = %err, "drone record flagged stale");
                newly_stale.push(edge_id.clone());
            }
        }
        newly_stale
    }

    /// Record a frame dropped at the decode boundary
    pub fn record_decode_failure(&mut self) {
        self.stats.decode_failures += 1;
    }

    /// Look up one drone record
    pub fn drone(&self, edge_id: &str) -> Option<&DroneRecord> {
        self.drones.get(edge_id)
    }

    /// Number of known drones, live or stale
    pub fn drone_count(&self) -> usize {
        self.drones.len()
    }

    /// The whole ledger, oldest first
    pub fn ledger(&self) -> &[AnomalyEvent] {
        &self.ledger
    }

    /// The most recent `n` ledger entries, oldest first
    pub fn ledger_tail(&self, n: usize) -> &[AnomalyEvent] {
        let start = self.ledger.len().saturating_sub(n);
        &self.ledger[start..]
    }

    /// Ledger breakdown by metric
    pub fn ledger_stats(&self) -> LedgerStats {
        let temperature = self
            .ledger
            .iter()
            .filter(|e| e.metric == Metric::Temperature)
            .count();
        LedgerStats {
            total: self.ledger.len(),
            temperature,
            humidity: self.ledger.len() - temperature,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// Consistent view of the whole registry
    pub fn view(&self) -> RegistryView {
        let mut drones: Vec<DroneStatus> = self
            .drones
            .values()
            .map(|record| DroneStatus {
                edge_id: record.edge_id.clone(),
                battery: record.battery,
                live: record.live,
                sensor_count: record.sensors.len(),
                last_update: record.last_update,
            })
            .collect();
        drones.sort_by(|a, b| a.edge_id.cmp(&b.edge_id));

        RegistryView {
            drones,
            ledger: self.ledger_stats(),
            stats: self.stats,
        }
    }
}
