// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-sensor channel table
//!
//! The edge node keeps one [`SensorChannel`] per sensor id: the last
//! known reading, a liveness flag, and the last time the sensor was
//! heard from. A disconnected channel keeps its snapshot for a grace
//! period before eviction, so a flapping sensor does not lose its place
//! in reports.

use aerie::protocol::Reading;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Ownership record for one sensor id
#[derive(Debug, Clone)]
pub struct SensorChannel {
    /// Last accepted reading (monotonic by timestamp)
    pub last_reading: Reading,
    /// Whether a connection for this sensor is currently open
    pub connected: bool,
    /// When the sensor was last heard from or seen disconnecting
    pub last_seen: DateTime<Utc>,
}

/// All sensor channels known to one edge node
#[derive(Debug, Default)]
pub struct SensorTable {
    channels: HashMap<String, SensorChannel>,
}

impl SensorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an incoming reading
    ///
    /// Creates the channel on first contact. The stored snapshot never
    /// regresses: a reading older than the stored one refreshes liveness
    /// but leaves the snapshot alone. Returns true when the sensor is
    /// new to this table.
    pub fn apply_reading(&mut self, reading: Reading, now: DateTime<Utc>) -> bool {
        match self.channels.get_mut(&reading.sensor_id) {
            Some(channel) => {
                channel.connected = true;
                channel.last_seen = now;
                if reading.timestamp >= channel.last_reading.timestamp {
                    channel.last_reading = reading;
                }
                false
            }
            None => {
                self.channels.insert(
                    reading.sensor_id.clone(),
                    SensorChannel {
                        last_reading: reading,
                        connected: true,
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    /// Mark a sensor's connection as lost, keeping its snapshot
    pub fn mark_disconnected(&mut self, sensor_id: &str, now: DateTime<Utc>) {
        if let Some(channel) = self.channels.get_mut(sensor_id) {
            channel.connected = false;
            channel.last_seen = now;
        }
    }

    /// Evict disconnected channels silent past the grace period
    ///
    /// Returns the evicted ids with how long each had been silent.
    pub fn evict_stale(&mut self, now: DateTime<Utc>, grace: Duration) -> Vec<(String, Duration)> {
        let stale: Vec<(String, Duration)> = self
            .channels
            .iter()
            .filter(|(_, ch)| !ch.connected && now - ch.last_seen > grace)
            .map(|(id, ch)| (id.clone(), now - ch.last_seen))
            .collect();

        for (id, _) in &stale {
            self.channels.remove(id);
        }
        stale
    }

    /// Clone the current snapshot map (includes in-grace channels)
    pub fn snapshot(&self) -> HashMap<String, Reading> {
        self.channels
            .iter()
            .map(|(id, ch)| (id.clone(), ch.last_reading.clone()))
            .collect()
    }

    /// Mean temperature and humidity across connected channels
    pub fn averages(&self) -> (Option<f64>, Option<f64>) {
        let connected: Vec<&SensorChannel> =
            self.channels.values().filter(|ch| ch.connected).collect();
        if connected.is_empty() {
            return (None, None);
        }

        let n = connected.len() as f64;
        let temp = connected.iter().map(|ch| ch.last_reading.temperature).sum::<f64>() / n;
        let hum = connected.iter().map(|ch| ch.last_reading.humidity).sum::<f64>() / n;
        (Some(temp), Some(hum))
    }

    /// Look up one channel
    pub fn get(&self, sensor_id: &str) -> Option<&SensorChannel> {
        self.channels.get(sensor_id)
    }

    /// Number of channels, connected or in grace
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of currently connected channels
    pub fn connected_count(&self) -> usize {
        self.channels.values().filter(|ch| ch.connected).count()
    }
}
