// AERIE - Distributed environmental telemetry
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Wire framing for AERIE links
//!
//! Both links (sensor → edge and edge → central) carry one JSON-encoded
//! [`Message`] per `\n`-terminated line. The framing is deliberately the
//! same on both sides so a single codec serves every connection.
//!
//! # Frame format
//!
//! ```text
//! {"type":"reading", ...}\n
//! {"type":"report", ...}\n
//! {"type":"control", ...}\n
//! ```
//!
//! Decoding never tears a connection down: a bad line yields a
//! [`DecodeError`] for the caller to log, and reception continues with
//! the next line.

use crate::error::{AerieError, DecodeError, Result};
use crate::protocol::Message;

/// Maximum accepted frame length in bytes, terminator included
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Frame delimiter
pub const FRAME_DELIMITER: u8 = b'\n';

/// Serialize a message into a delimited frame ready for the socket
pub fn encode_frame(message: &Message) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)
        .map_err(|e| AerieError::Protocol(format!("serialize failed: {}", e)))?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Decode one line (without or with its trailing delimiter) into a message
pub fn decode_line(line: &str) -> std::result::Result<Message, DecodeError> {
    if line.len() > MAX_FRAME_BYTES {
        return Err(DecodeError::FrameTooLong {
            len: line.len(),
            max: MAX_FRAME_BYTES,
        });
    }

    let trimmed = line.trim_end_matches(|c| c == '\r' || c == '\n');
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    serde_json::from_str(trimmed).map_err(|e| DecodeError::Malformed {
        reason: e.to_string(),
    })
}

/// Decode one raw frame into a message
pub fn decode_frame(bytes: &[u8]) -> std::result::Result<Message, DecodeError> {
    let line = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    decode_line(line)
}
