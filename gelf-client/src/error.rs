//! Writer error types.

use gelf_protocol::ProtocolError;
use thiserror::Error;

/// Errors returned by [`crate::Writer`].
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("invalid destination address: {0}")]
    InvalidAddress(String),

    #[error("failed to resolve '{addr}': {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding error: {0}")]
    Encoding(#[source] ProtocolError),

    #[error("compression error: {0}")]
    Compression(#[source] ProtocolError),

    #[error("message too large: {needed} chunks required (max {max})")]
    MessageTooLarge { needed: usize, max: usize },

    #[error("invalid writer configuration: {0}")]
    Config(String),

    #[error("send failed after {sent} of {total} datagrams: {source}")]
    Transport {
        sent: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Returns whether the error was raised before any datagram left.
    pub fn is_pre_send(&self) -> bool {
        !matches!(self, WriterError::Transport { sent, .. } if *sent > 0)
    }
}

impl From<ProtocolError> for WriterError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::TooManyChunks { needed, max } => {
                WriterError::MessageTooLarge { needed, max }
            }
            ProtocolError::DatagramTooSmall { .. } => WriterError::Config(err.to_string()),
            ProtocolError::Compression(_) => WriterError::Compression(err),
            other => WriterError::Encoding(other),
        }
    }
}

impl From<WriterError> for std::io::Error {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::Io(e) => e,
            WriterError::Transport { source, .. } => source,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
