// AERIE Central - Monitoring registry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the central registry

use thiserror::Error;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum CentralError {
    /// Unrecoverable configuration problem, fatal at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind the edge-facing listener
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

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, CentralError>;
