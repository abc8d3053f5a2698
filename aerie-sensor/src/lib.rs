// AERIE Sensor - Leaf sensor simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AERIE Sensor - Leaf sensor simulator
//!
//! Emits one synthetic [`Reading`](aerie::Reading) per interval over a
//! retrying TCP connection to an edge node. Transient network failures
//! never terminate the node: it reconnects forever under its
//! [`RetryPolicy`]. Only configuration errors are fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aerie_sensor::{SensorConfig, SensorNode};
//!
//! # async fn run() -> Result<(), aerie_sensor::SensorError> {
//! let config = SensorConfig::new("127.0.0.1:8888", "sensor1");
//! let node = SensorNode::new(config)?;
//! node.run().await
//! # }
//! ```

mod generator;

pub use generator::{Band, GeneratorConfig, MetricProfile, ReadingGenerator};

use aerie::error::ConnectError;
use aerie::protocol::Message;
use aerie::retry::RetryPolicy;
use aerie::wire::encode_frame;
use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Errors a sensor node can raise
#[derive(Error, Debug)]
pub enum SensorError {
    /// Unrecoverable configuration problem, fatal at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Protocol-level failure while framing a reading
    #[error(transparent)]
    Protocol(#[from] aerie::AerieError),
}

/// Result type alias for sensor operations
pub type Result<T> = std::result::Result<T, SensorError>;

/// Construction-time sensor configuration
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Address of the edge node to stream to
    pub drone_addr: String,
    /// Unique identifier for this sensor
    pub sensor_id: String,
    /// Time between transmissions
    pub interval: Duration,
    /// 1-in-N chance per tick to emit an anomalous reading
    pub anomaly_frequency: u32,
    /// Reconnect pacing
    pub retry: RetryPolicy,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl SensorConfig {
    /// Create a configuration with stock intervals and odds
    pub fn new(drone_addr: impl Into<String>, sensor_id: impl Into<String>) -> Self {
        Self {
            drone_addr: drone_addr.into(),
            sensor_id: sensor_id.into(),
            interval: Duration::from_secs(5),
            anomaly_frequency: 20,
            retry: RetryPolicy::fixed_secs(5),
            seed: None,
        }
    }

    /// Set the transmission interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the anomaly injection odds
    pub fn with_anomaly_frequency(mut self, frequency: u32) -> Self {
        self.anomaly_frequency = frequency;
        self
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.sensor_id.trim().is_empty() {
            return Err(SensorError::InvalidConfig(
                "sensor_id must not be empty".to_string(),
            ));
        }
        if self.drone_addr.trim().is_empty() {
            return Err(SensorError::InvalidConfig(
                "drone_addr must not be empty".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(SensorError::InvalidConfig(
                "interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Transmission counters
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorStats {
    /// Readings written to the link
    pub readings_sent: u64,
    /// Readings that carried an injected anomaly
    pub anomalies_injected: u64,
    /// Connection attempts, successful or not
    pub connection_attempts: u64,
}

/// A simulated leaf sensor
pub struct SensorNode {
    config: SensorConfig,
    generator: ReadingGenerator,
    stats: SensorStats,
}

impl SensorNode {
    /// Validate the configuration and build the node
    pub fn new(config: SensorConfig) -> Result<Self> {
        config.validate()?;

        let mut generator_config =
            GeneratorConfig::new(config.sensor_id.clone(), config.anomaly_frequency);
        generator_config.seed = config.seed;

        Ok(Self {
            generator: ReadingGenerator::new(generator_config),
            stats: SensorStats::default(),
            config,
        })
    }

    /// Transmission counters so far
    pub fn stats(&self) -> SensorStats {
        self.stats
    }

    /// Run the transmit loop forever
    ///
    /// Never returns on transient network failure; every disconnect
    /// re-enters the reconnect loop under the configured retry policy.
    pub async fn run(mut self) -> Result<()> {
        info!(
            sensor_id = %self.config.sensor_id,
            drone_addr = %self.config.drone_addr,
            interval_secs = self.config.interval.as_secs(),
            anomaly_frequency = self.config.anomaly_frequency,
            "starting sensor node"
        );

        let mut attempt: u32 = 0;
        loop {
            self.stats.connection_attempts += 1;
            match TcpStream::connect(&self.config.drone_addr).await {
                Ok(stream) => {
                    info!(drone_addr = %self.config.drone_addr, "connected to edge node");
                    attempt = 0;
                    if let Err(err) = self.transmit_loop(stream).await {
                        warn!(error = %err, "link to edge node lost");
                    }
                }
                Err(err) => {
                    let err = ConnectError::from_io(self.config.drone_addr.clone(), err);
                    warn!(error = %err, "could not reach edge node");
                }
            }

            let delay = self.config.retry.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            debug!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
            sleep(delay).await;
        }
    }

    /// Emit readings on an established connection until it fails
    async fn transmit_loop(&mut self, mut stream: TcpStream) -> std::io::Result<()> {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (reading, injected) = self.generator.next_reading(Utc::now());
            let frame = encode_frame(&Message::Reading(reading.clone()))
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

            stream.write_all(&frame).await?;
            self.stats.readings_sent += 1;

            match injected {
                Some(metric) => {
                    self.stats.anomalies_injected += 1;
                    info!(
                        readings_sent = self.stats.readings_sent,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        anomaly = %metric,
                        "sent anomalous reading"
                    );
                }
                None => {
                    debug!(
                        readings_sent = self.stats.readings_sent,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        "sent reading"
                    );
                }
            }
        }
    }
}
