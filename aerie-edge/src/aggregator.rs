// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shared edge node state
//!
//! [`EdgeState`] is the single piece of shared mutable state on an edge
//! node: the battery machine, the sensor table, the pending-report
//! anomaly buffer, and the operational counters. Connection tasks and
//! the timer task mutate it behind one mutex with narrow, await-free
//! critical sections, so every report is assembled from a consistent
//! snapshot.

use crate::config::EdgeConfig;
use crate::sensors::SensorTable;
use aerie::battery::{BatteryMachine, ModeChange};
use aerie::detector::AnomalyDetector;
use aerie::error::{StaleSourceError, ValidationError};
use aerie::protocol::{
    AggregateReport, AnomalyEvent, BatteryState, CommandKind, ControlCommand, Reading,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Operational counters for one edge node
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeStats {
    /// Readings accepted from sensors
    pub readings_received: u64,
    /// Readings that arrived while the node was not actively sampling
    pub readings_while_grounded: u64,
    /// Anomaly events appended to the buffer
    pub anomalies_detected: u64,
    /// Frames dropped at the decode boundary
    pub decode_failures: u64,
    /// Control commands applied
    pub commands_applied: u64,
    /// Control commands rejected by validation
    pub commands_rejected: u64,
    /// Aggregate reports assembled
    pub reports_built: u64,
}

/// Consistent read-only view for presentation consumers
#[derive(Debug, Clone)]
pub struct EdgeSnapshot {
    /// This node's id
    pub edge_id: String,
    /// Battery state at snapshot time
    pub battery: BatteryState,
    /// Last reading per known sensor
    pub sensors: HashMap<String, Reading>,
    /// Currently connected sensors
    pub connected_sensors: usize,
    /// Anomalies accumulated since the last report
    pub pending_anomalies: usize,
    /// Counters at snapshot time
    pub stats: EdgeStats,
}

/// Shared mutable state of one edge node
#[derive(Debug)]
pub struct EdgeState {
    edge_id: String,
    battery: BatteryMachine,
    detector: AnomalyDetector,
    sensors: SensorTable,
    anomaly_buffer: Vec<AnomalyEvent>,
    stats: EdgeStats,
}

/// Lock the shared state, recovering from poisoning
///
/// A poisoned lock only means another task panicked mid-section; the
/// state transitions themselves are all single assignments, so the data
/// is still usable.
pub(crate) fn lock_state(state: &Mutex<EdgeState>) -> MutexGuard<'_, EdgeState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EdgeState {
    /// Build the initial state for a node
    pub fn new(config: &EdgeConfig) -> Self {
        Self {
            edge_id: config.edge_id.clone(),
            battery: BatteryMachine::new(config.battery.clone()),
            detector: AnomalyDetector::with_config(config.detector.clone()),
            sensors: SensorTable::new(),
            anomaly_buffer: Vec::new(),
            stats: EdgeStats::default(),
        }
    }

    /// Apply one accepted reading
    ///
    /// Classifies it, appends one event per violated metric, and updates
    /// the sensor snapshot. Anomalous readings are informational, never
    /// discarded.
    pub fn apply_reading(&mut self, reading: Reading, now: DateTime<Utc>) {
        self.stats.readings_received += 1;
        if self.battery.mode().is_grounded() {
            self.stats.readings_while_grounded += 1;
        }

        let events = self.detector.evaluate(&reading, &self.edge_id);
        for event in &events {
            warn!(
                sensor_id = %event.sensor_id,
                metric = %event.metric,
                value = event.value,
                "anomaly detected"
            );
        }
        self.stats.anomalies_detected += events.len() as u64;
        self.anomaly_buffer.extend(events);

        let sensor_id = reading.sensor_id.clone();
        if self.sensors.apply_reading(reading, now) {
            info!(sensor_id = %sensor_id, "new sensor registered");
        }
    }

    /// Apply a manual override
    ///
    /// Validation failures leave the state untouched. Accepted overrides
    /// rewrite level/mode immediately; the next tick evaluates the
    /// normal rules against the new state.
    pub fn apply_command(&mut self, command: &ControlCommand) -> Result<(), ValidationError> {
        let result = self.apply_command_inner(command);
        match &result {
            Ok(()) => {
                self.stats.commands_applied += 1;
                info!(kind = %command.kind, level = ?command.level, "override applied");
            }
            Err(err) => {
                self.stats.commands_rejected += 1;
                warn!(kind = %command.kind, error = %err, "override rejected");
            }
        }
        result
    }

    fn apply_command_inner(&mut self, command: &ControlCommand) -> Result<(), ValidationError> {
        if command.target != self.edge_id {
            return Err(ValidationError::UnknownTarget {
                target: command.target.clone(),
            });
        }

        match command.kind {
            CommandKind::SetBattery => {
                let level = command.level.ok_or_else(|| ValidationError::MissingLevel {
                    kind: command.kind.to_string(),
                })?;
                let max = self.battery.config().max_level;
                if level > max {
                    return Err(ValidationError::BatteryLevelOutOfRange { value: level, max });
                }
                self.battery.set_level(level);
            }
            CommandKind::ForceReturnToBase => self.battery.force_return_to_base(),
            CommandKind::ForceResume => self.battery.force_resume(),
        }
        Ok(())
    }

    /// Advance the battery simulation by one tick
    pub fn battery_tick(&mut self) -> Option<ModeChange> {
        let change = self.battery.tick();
        if let Some(change) = change {
            info!(
                level = self.battery.level(),
                mode = %self.battery.mode(),
                change = ?change,
                "flight mode changed"
            );
        }
        change
    }

    /// Record a frame dropped at the decode boundary
    pub fn record_decode_failure(&mut self) {
        self.stats.decode_failures += 1;
    }

    /// Mark a sensor's connection as lost
    pub fn mark_disconnected(&mut self, sensor_id: &str, now: DateTime<Utc>) {
        self.sensors.mark_disconnected(sensor_id, now);
    }

    /// Evict channels disconnected past the grace period
    pub fn sweep_stale(&mut self, now: DateTime<Utc>, grace: Duration) {
        for (sensor_id, silent_for) in self.sensors.evict_stale(now, grace) {
            let err = StaleSourceError {
                source_id: sensor_id,
                silent_for_secs: silent_for.num_seconds().max(0) as u64,
                limit_secs: grace.num_seconds().max(0) as u64,
            };
            warn!(error = %err, "sensor channel evicted");
        }
    }

    /// Assemble the next aggregate report and clear the anomaly buffer
    ///
    /// The sensor snapshot map persists across reports; only the
    /// anomaly buffer is consumed.
    pub fn build_report(&mut self, now: DateTime<Utc>) -> AggregateReport {
        let (avg_temperature, avg_humidity) = self.sensors.averages();
        let report = AggregateReport {
            edge_id: self.edge_id.clone(),
            battery: self.battery.state(),
            sensors: self.sensors.snapshot(),
            anomalies: std::mem::take(&mut self.anomaly_buffer),
            avg_temperature,
            avg_humidity,
            sent_at: now,
        };
        self.stats.reports_built += 1;
        report
    }

    /// Consistent view for presentation consumers
    pub fn snapshot(&self) -> EdgeSnapshot {
        EdgeSnapshot {
            edge_id: self.edge_id.clone(),
            battery: self.battery.state(),
            sensors: self.sensors.snapshot(),
            connected_sensors: self.sensors.connected_count(),
            pending_anomalies: self.anomaly_buffer.len(),
            stats: self.stats,
        }
    }

    /// Current battery state
    pub fn battery(&self) -> BatteryState {
        self.battery.state()
    }

    /// Counters so far
    pub fn stats(&self) -> EdgeStats {
        self.stats
    }
}
