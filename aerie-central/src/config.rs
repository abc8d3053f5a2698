// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the central registry

use std::time::Duration;

/// Construction-time registry configuration
#[derive(Debug, Clone)]
pub struct CentralConfig {
    /// Address the edge-facing listener binds
    pub listen_addr: String,
    /// Silence after which a drone record is flagged stale
    ///
    /// Stock value is three reporting intervals.
    pub liveness_timeout: Duration,
    /// How often the liveness sweeper runs
    pub sweep_interval: Duration,
    /// Averaged-history points kept per drone
    pub history_cap: usize,
}

impl Default for CentralConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", aerie::DEFAULT_CENTRAL_PORT),
            liveness_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(5),
            history_cap: 100,
        }
    }
}

impl CentralConfig {
    /// Create a configuration with stock timeouts
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listen address
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Set the liveness timeout
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.liveness_timeout.is_zero() || self.sweep_interval.is_zero() {
            return Err("timeouts must be positive".to_string());
        }
        if self.history_cap == 0 {
            return Err("history_cap must be at least 1".to_string());
        }
        Ok(())
    }
}
