// AERIE Sensor - Leaf sensor simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic reading generation with anomaly injection
//!
//! Each tick independently decides (uniform 1-in-N chance) whether the
//! emitted reading is anomalous. If so, one metric, chosen with equal
//! probability, is drawn from an out-of-range band; the other metric
//! stays in range. Generation is deterministic under a fixed seed.

use aerie::protocol::{Metric, Reading};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Closed interval to draw a value from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower bound
    pub lo: f64,
    /// Upper bound
    pub hi: f64,
}

impl Band {
    /// Create a band
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        rng.gen_range(self.lo..=self.hi)
    }
}

/// Value bands for one metric: the normal band plus the two bands an
/// injected anomaly is drawn from
#[derive(Debug, Clone, PartialEq)]
pub struct MetricProfile {
    /// In-range values
    pub normal: Band,
    /// Anomalous values below the normal band
    pub anomalous_low: Band,
    /// Anomalous values above the normal band
    pub anomalous_high: Band,
}

impl MetricProfile {
    /// Stock temperature profile in degrees Celsius
    pub fn temperature() -> Self {
        Self {
            normal: Band::new(20.0, 30.0),
            anomalous_low: Band::new(0.0, 15.0),
            anomalous_high: Band::new(36.0, 50.0),
        }
    }

    /// Stock relative-humidity profile in percent
    pub fn humidity() -> Self {
        Self {
            normal: Band::new(40.0, 60.0),
            anomalous_low: Band::new(0.0, 25.0),
            anomalous_high: Band::new(75.0, 100.0),
        }
    }

    fn sample_normal(&self, rng: &mut StdRng) -> f64 {
        self.normal.sample(rng)
    }

    /// Draw from the low or high anomalous band with equal probability
    fn sample_anomalous(&self, rng: &mut StdRng) -> f64 {
        if rng.gen_bool(0.5) {
            self.anomalous_low.sample(rng)
        } else {
            self.anomalous_high.sample(rng)
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Identifier stamped on every reading
    pub sensor_id: String,
    /// 1-in-N chance per tick to inject an anomaly (1 = every tick)
    pub anomaly_frequency: u32,
    /// Temperature bands
    pub temperature: MetricProfile,
    /// Humidity bands
    pub humidity: MetricProfile,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    /// Create a configuration with the stock profiles
    pub fn new(sensor_id: impl Into<String>, anomaly_frequency: u32) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            anomaly_frequency,
            temperature: MetricProfile::temperature(),
            humidity: MetricProfile::humidity(),
            seed: None,
        }
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Infinite, restartable source of synthetic readings
#[derive(Debug)]
pub struct ReadingGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl ReadingGenerator {
    /// Create a generator
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Produce the next reading
    ///
    /// Returns the reading and, when an anomaly was injected, which
    /// metric carries it.
    pub fn next_reading(&mut self, now: DateTime<Utc>) -> (Reading, Option<Metric>) {
        let inject = self.config.anomaly_frequency > 0
            && self.rng.gen_range(1..=self.config.anomaly_frequency) == 1;

        let injected = if inject {
            if self.rng.gen_bool(0.5) {
                Some(Metric::Temperature)
            } else {
                Some(Metric::Humidity)
            }
        } else {
            None
        };

        let temperature = match injected {
            Some(Metric::Temperature) => self.config.temperature.sample_anomalous(&mut self.rng),
            _ => self.config.temperature.sample_normal(&mut self.rng),
        };
        let humidity = match injected {
            Some(Metric::Humidity) => self.config.humidity.sample_anomalous(&mut self.rng),
            _ => self.config.humidity.sample_normal(&mut self.rng),
        };

        let reading = Reading::new(
            self.config.sensor_id.clone(),
            round2(temperature),
            round2(humidity),
            now,
        );
        (reading, injected)
    }

    /// Generator configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

/// Round to two decimals, the precision real firmware would report
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
