// AERIE Edge - Drone edge aggregator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the edge aggregator

use thiserror::Error;

/// Main error type for edge node operations
///
/// Only [`EdgeError::InvalidConfig`] and [`EdgeError::Bind`] are fatal;
/// everything that happens after startup is handled in place.
#[derive(Error, Debug)]
pub enum EdgeError {
    /// Unrecoverable configuration problem, fatal at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind the sensor-facing listener
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Error from the core library
    #[error(transparent)]
    Core(#[from] aerie::AerieError),
}

/// Result type alias for edge node operations
pub type Result<T> = std::result::Result<T, EdgeError>;
