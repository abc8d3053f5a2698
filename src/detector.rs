// AERIE - Distributed environmental telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Threshold-based anomaly detection
//!
//! A reading is anomalous when its temperature or humidity falls outside
//! the configured normal range. Each violated metric yields its own
//! [`AnomalyEvent`], so one reading produces zero, one, or two events.
//! Classification never mutates or discards the reading: anomalous
//! readings still update the sensor snapshot.

use crate::protocol::{AnomalyEvent, Metric, Reading};

/// Inclusive range of values considered normal for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalRange {
    /// Lowest normal value
    pub min: f64,
    /// Highest normal value
    pub max: f64,
}

impl NormalRange {
    /// Create a range
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether a value is within the range, bounds included
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Normal ranges for both metrics
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Normal temperature band in degrees Celsius
    pub temperature: NormalRange,
    /// Normal relative humidity band in percent
    pub humidity: NormalRange,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            temperature: NormalRange::new(15.0, 35.0),
            humidity: NormalRange::new(30.0, 70.0),
        }
    }
}

/// Classifies readings against configured normal ranges
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    /// Create a detector with default ranges
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    /// Create a detector with custom ranges
    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Evaluate one reading, producing one event per violated metric
    pub fn evaluate(&self, reading: &Reading, edge_id: &str) -> Vec<AnomalyEvent> {
        let mut events = Vec::new();

        if !self.config.temperature.contains(reading.temperature) {
            events.push(AnomalyEvent {
                sensor_id: reading.sensor_id.clone(),
                metric: Metric::Temperature,
                value: reading.temperature,
                timestamp: reading.timestamp,
                edge_id: edge_id.to_string(),
            });
        }

        if !self.config.humidity.contains(reading.humidity) {
            events.push(AnomalyEvent {
                sensor_id: reading.sensor_id.clone(),
                metric: Metric::Humidity,
                value: reading.humidity,
                timestamp: reading.timestamp,
                edge_id: edge_id.to_string(),
            });
        }

        events
    }

    /// Check whether a reading violates any range
    pub fn is_anomalous(&self, reading: &Reading) -> bool {
        !self.config.temperature.contains(reading.temperature)
            || !self.config.humidity.contains(reading.humidity)
    }

    /// Configured ranges
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}
