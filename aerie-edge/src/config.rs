// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the edge aggregator

use aerie::battery::BatteryConfig;
use aerie::detector::DetectorConfig;
use aerie::retry::RetryPolicy;
use std::time::Duration;

/// Construction-time edge node configuration
///
/// Immutable once the node is built; every knob a deployment tunes lives
/// here rather than in process-global state.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Identifier this node reports under
    pub edge_id: String,
    /// Address the sensor-facing listener binds
    pub listen_addr: String,
    /// Address of the central registry
    pub central_addr: String,
    /// Battery simulation tuning
    pub battery: BatteryConfig,
    /// Normal ranges for anomaly detection
    pub detector: DetectorConfig,
    /// Wall-clock interval between battery ticks
    pub battery_tick_interval: Duration,
    /// Wall-clock interval between aggregate reports
    pub report_interval: Duration,
    /// How long a disconnected sensor's snapshot survives before eviction
    pub sensor_grace: Duration,
    /// Maximum reports queued while the central link is down
    pub uplink_queue_limit: usize,
    /// Reconnect pacing for the central link
    pub uplink_retry: RetryPolicy,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            edge_id: "drone1".to_string(),
            listen_addr: format!("0.0.0.0:{}", aerie::DEFAULT_SENSOR_PORT),
            central_addr: format!("127.0.0.1:{}", aerie::DEFAULT_CENTRAL_PORT),
            battery: BatteryConfig::default(),
            detector: DetectorConfig::default(),
            battery_tick_interval: Duration::from_secs(10),
            report_interval: Duration::from_secs(5),
            sensor_grace: Duration::from_secs(60),
            uplink_queue_limit: 32,
            uplink_retry: RetryPolicy::default(),
        }
    }
}

impl EdgeConfig {
    /// Create a configuration for the given edge id
    pub fn new(edge_id: impl Into<String>) -> Self {
        Self {
            edge_id: edge_id.into(),
            ..Default::default()
        }
    }

    /// Set the sensor-facing listen address
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the central registry address
    pub fn with_central_addr(mut self, addr: impl Into<String>) -> Self {
        self.central_addr = addr.into();
        self
    }

    /// Set the reporting interval
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the battery tick interval
    pub fn with_battery_tick_interval(mut self, interval: Duration) -> Self {
        self.battery_tick_interval = interval;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.edge_id.trim().is_empty() {
            return Err("edge_id must not be empty".to_string());
        }
        if self.report_interval.is_zero() || self.battery_tick_interval.is_zero() {
            return Err("timer intervals must be positive".to_string());
        }
        if self.uplink_queue_limit == 0 {
            return Err("uplink_queue_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_stock_deployment() {
        let config = EdgeConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8888");
        assert_eq!(config.central_addr, "127.0.0.1:6000");
        assert_eq!(config.battery_tick_interval, Duration::from_secs(10));
        assert_eq!(config.report_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_edge_id_invalid() {
        let config = EdgeConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_limit_invalid() {
        let config = EdgeConfig {
            uplink_queue_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
