//! # AERIE - Distributed environmental telemetry
//!
//! Wire protocol and core logic for a three-tier telemetry network:
//! leaf sensors stream readings to drone-mounted edge aggregators, which
//! relay periodic summaries to a central registry.
//!
//! This crate holds everything the tiers share and everything that is
//! pure logic:
//!
//! - [`protocol`]: message shapes and the tagged wire envelope
//! - [`wire`]: newline-delimited JSON framing for both links
//! - [`error`]: the connect/decode/validation/staleness taxonomy
//! - [`battery`]: the battery-driven flight state machine
//! - [`detector`]: threshold-based anomaly classification
//! - [`retry`]: reconnect pacing policies
//!
//! The networking tiers live in their own crates: `aerie-sensor`,
//! `aerie-edge`, and `aerie-central`.
//!
//! ## Quick Start
//!
//! ```rust
//! use aerie::{AnomalyDetector, BatteryMachine, Message, Reading};
//! use chrono::Utc;
//!
//! let detector = AnomalyDetector::new();
//! let mut battery = BatteryMachine::default();
//!
//! // Classify a reading the way an edge node does
//! let reading = Reading::new("sensor1", 40.0, 50.0, Utc::now());
//! let events = detector.evaluate(&reading, "drone1");
//! assert_eq!(events.len(), 1);
//!
//! // Frame it for the wire
//! let frame = aerie::wire::encode_frame(&Message::Reading(reading)).unwrap();
//! let restored = aerie::wire::decode_frame(&frame).unwrap();
//!
//! battery.tick();
//! ```

// Modules
pub mod battery;
pub mod detector;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod wire;

// Re-exports for convenient access
pub use battery::{BatteryConfig, BatteryMachine, ModeChange};
pub use detector::{AnomalyDetector, DetectorConfig, NormalRange};
pub use error::{
    AerieError, ConnectError, DecodeError, Result, StaleSourceError, ValidationError,
};
pub use protocol::{
    AggregateReport, AnomalyEvent, BatteryState, CommandKind, ControlCommand, FlightMode, Message,
    Metric, Reading,
};
pub use retry::RetryPolicy;
pub use wire::{decode_frame, decode_line, encode_frame, MAX_FRAME_BYTES};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port an edge node listens on for sensors and overrides
pub const DEFAULT_SENSOR_PORT: u16 = 8888;

/// Default port the central registry listens on for edge nodes
pub const DEFAULT_CENTRAL_PORT: u16 = 6000;
