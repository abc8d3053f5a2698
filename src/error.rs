//! Error types for AERIE
//!
//! The taxonomy mirrors how each failure is handled: connection errors
//! trigger reconnects, decode errors drop the offending frame, validation
//! errors reject a command, staleness flags a silent source. None of them
//! brings down an unrelated connection; only startup configuration errors
//! are fatal to a process.

use std::io;
use thiserror::Error;

/// Result type alias for AERIE operations
pub type Result<T> = std::result::Result<T, AerieError>;

/// Main error type for AERIE operations
#[derive(Error, Debug)]
pub enum AerieError {
    /// Transient connection failure
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Malformed or schema-violating frame
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Rejected control command
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Source silent past its timeout
    #[error("Stale source: {0}")]
    Stale(#[from] StaleSourceError),

    /// Protocol-level failure (serialization and the like)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Transient failure on an outbound link
///
/// Always recoverable: the owning loop reconnects under its retry policy
/// and never terminates on one of these.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Peer refused the connection
    #[error("Connection refused by {addr}")]
    Refused { addr: String },

    /// Connect attempt timed out
    #[error("Connection to {addr} timed out after {timeout_ms}ms")]
    Timeout { addr: String, timeout_ms: u64 },

    /// Any other I/O failure on the link
    #[error("I/O failure on link to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

impl ConnectError {
    /// Classify an I/O error from a connect or write on the link to `addr`
    pub fn from_io(addr: impl Into<String>, err: io::Error) -> Self {
        let addr = addr.into();
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectError::Refused { addr },
            io::ErrorKind::TimedOut => ConnectError::Timeout {
                addr,
                timeout_ms: 0,
            },
            _ => ConnectError::Io { addr, source: err },
        }
    }
}

/// Errors while decoding a frame
///
/// A decode error drops the offending frame only; the connection it
/// arrived on stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is not valid JSON or violates a message schema
    #[error("Malformed frame: {reason}")]
    Malformed { reason: String },

    /// Frame exceeds the framing limit
    #[error("Frame too long: {len} bytes exceeds maximum {max}")]
    FrameTooLong { len: usize, max: usize },

    /// Frame is not valid UTF-8
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,

    /// Nothing between two delimiters
    #[error("Empty frame")]
    Empty,
}

/// Rejected control command; the targeted state is left unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Battery level outside 0..=100
    #[error("Battery level {value} out of range 0-{max}")]
    BatteryLevelOutOfRange { value: u8, max: u8 },

    /// Command kind requires a value that was not supplied
    #[error("Command {kind} requires a level value")]
    MissingLevel { kind: String },

    /// Command addressed to an edge this node is not
    #[error("Command targets unknown edge '{target}'")]
    UnknownTarget { target: String },
}

/// A source went silent past its liveness timeout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No data from '{source_id}' for {silent_for_secs}s (limit {limit_secs}s)")]
pub struct StaleSourceError {
    /// The silent sensor or edge id
    pub source_id: String,
    /// How long the source has been silent
    pub silent_for_secs: u64,
    /// The configured timeout it exceeded
    pub limit_secs: u64,
}
