//! Protocol error types.

use thiserror::Error;

/// Errors raised while building, encoding, chunking or reassembling messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid extra field '{key}': {reason}")]
    InvalidField { key: String, reason: &'static str },

    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("message too large: {needed} chunks required (max {max})")]
    TooManyChunks { needed: usize, max: usize },

    #[error("datagram size {size} too small (must exceed {min} bytes)")]
    DatagramTooSmall { size: usize, min: usize },

    #[error("invalid chunk magic: {0:02x?}")]
    InvalidChunkMagic([u8; 2]),

    #[error("truncated chunk: {len} bytes (header needs {needed})")]
    TruncatedChunk { len: usize, needed: usize },

    #[error("invalid chunk sequence {sequence} of {total}")]
    InvalidSequence { sequence: u8, total: u8 },

    #[error("chunk total changed for message {id}: expected {expected}, got {actual}")]
    TotalMismatch {
        id: String,
        expected: u8,
        actual: u8,
    },

    #[error("unknown payload magic: {0:02x?}")]
    UnknownMagic([u8; 2]),

    #[error("invalid level: {0}")]
    InvalidLevel(String),
}

impl ProtocolError {
    /// Returns whether this error came from the serialization step.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            ProtocolError::Json(_) | ProtocolError::InvalidField { .. }
        )
    }
}
