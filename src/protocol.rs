//! Protocol definitions for the AERIE telemetry network
//!
//! This module defines the message shapes exchanged between the three
//! tiers:
//! - `Reading` (sensor → edge)
//! - `AggregateReport` (edge → central)
//! - `ControlCommand` (presentation → edge)
//!
//! All messages travel inside the [`Message`] envelope, tagged by a
//! `type` field. Schemas are strict: unknown or missing fields are
//! rejected at the decode boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single environmental measurement from one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reading {
    /// Identifier of the emitting sensor
    pub sensor_id: String,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Moment the sensor produced the value
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a new reading
    pub fn new(
        sensor_id: impl Into<String>,
        temperature: f64,
        humidity: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            temperature,
            humidity,
            timestamp,
        }
    }
}

/// Operational mode of an edge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightMode {
    /// Airborne and actively sampling
    #[default]
    Active,
    /// Battery below threshold, heading back to the charging pad
    ReturningToBase,
    /// Landed and recharging
    Charging,
}

impl FlightMode {
    /// Check whether readings received in this mode count as active sampling
    pub fn is_sampling(&self) -> bool {
        matches!(self, FlightMode::Active)
    }

    /// Check whether the node is grounded or on its way to the ground
    pub fn is_grounded(&self) -> bool {
        !self.is_sampling()
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightMode::Active => write!(f, "active"),
            FlightMode::ReturningToBase => write!(f, "returning-to-base"),
            FlightMode::Charging => write!(f, "charging"),
        }
    }
}

/// Battery charge and flight mode, as carried in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryState {
    /// Charge level, always within 0-100
    pub level: u8,
    /// Current flight mode
    pub mode: FlightMode,
}

impl BatteryState {
    /// Create a battery state
    pub fn new(level: u8, mode: FlightMode) -> Self {
        Self { level, mode }
    }

    /// Fully charged, active state
    pub fn full() -> Self {
        Self {
            level: 100,
            mode: FlightMode::Active,
        }
    }
}

/// Which measured quantity an anomaly refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Temperature => write!(f, "temperature"),
            Metric::Humidity => write!(f, "humidity"),
        }
    }
}

/// One out-of-range observation, recorded by an edge node
///
/// Append-only: once created an event is never mutated, and the central
/// ledger never deletes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnomalyEvent {
    /// Sensor that produced the offending reading
    pub sensor_id: String,
    /// Metric that violated its normal range
    pub metric: Metric,
    /// The out-of-range value
    pub value: f64,
    /// Timestamp of the offending reading
    pub timestamp: DateTime<Utc>,
    /// Edge node that detected the violation
    pub edge_id: String,
}

/// Periodic summary an edge node sends upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateReport {
    /// Identifier of the reporting edge node
    pub edge_id: String,
    /// Battery state at assembly time
    pub battery: BatteryState,
    /// Last known reading per sensor (live snapshot, not an event queue)
    pub sensors: HashMap<String, Reading>,
    /// Anomalies detected since the previous report, in detection order
    pub anomalies: Vec<AnomalyEvent>,
    /// Mean temperature across connected sensors, if any are connected
    pub avg_temperature: Option<f64>,
    /// Mean humidity across connected sensors, if any are connected
    pub avg_humidity: Option<f64>,
    /// Moment the report was assembled
    pub sent_at: DateTime<Utc>,
}

impl AggregateReport {
    /// Number of anomalies carried in this report
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    /// Number of sensors in the snapshot
    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }
}

/// Kinds of manual override a presentation layer may issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Force the battery to a specific level (requires `level`)
    SetBattery,
    /// Force the node into returning-to-base mode
    ForceReturnToBase,
    /// Force the node back into active mode
    ForceResume,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::SetBattery => write!(f, "set-battery"),
            CommandKind::ForceReturnToBase => write!(f, "force-return-to-base"),
            CommandKind::ForceResume => write!(f, "force-resume"),
        }
    }
}

/// Manual override command targeting one edge node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlCommand {
    /// Edge node the command addresses
    pub target: String,
    /// What to do
    pub kind: CommandKind,
    /// Battery level for `SetBattery`, unused otherwise
    pub level: Option<u8>,
}

impl ControlCommand {
    /// Force the battery level of `target`
    pub fn set_battery(target: impl Into<String>, level: u8) -> Self {
        Self {
            target: target.into(),
            kind: CommandKind::SetBattery,
            level: Some(level),
        }
    }

    /// Order `target` back to base
    pub fn force_return_to_base(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: CommandKind::ForceReturnToBase,
            level: None,
        }
    }

    /// Order `target` to resume normal operation
    pub fn force_resume(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: CommandKind::ForceResume,
            level: None,
        }
    }
}

/// Envelope for every frame on either link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Sensor → edge measurement
    Reading(Reading),
    /// Edge → central summary
    Report(AggregateReport),
    /// Presentation → edge override
    Control(ControlCommand),
}
