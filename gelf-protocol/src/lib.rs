//! # gelf-protocol
//!
//! Wire protocol implementation for GELF (Graylog Extended Log Format) over UDP.
//!
//! This crate provides:
//! - The GELF record model and short/full message splitting
//! - JSON serialization with zlib/gzip compression
//! - Chunked datagram framing for payloads larger than one datagram
//! - Chunk reassembly for verification and test tooling

pub mod chunk;
pub mod codec;
pub mod error;
pub mod record;

pub use chunk::{ChunkAssembler, ChunkHeader, Chunker, MessageId, CHUNK_HEADER_SIZE, CHUNK_MAGIC};
pub use codec::{Compression, Decoder, Encoder};
pub use error::ProtocolError;
pub use record::{split_message, Level, LogRecord, RecordBuilder};

/// GELF format version written into every record.
pub const GELF_VERSION: &str = "1.1";

/// Default maximum datagram size, chosen to stay under common WAN MTUs.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1420;

/// Datagram size suitable for jumbo-frame LANs.
pub const LAN_MAX_DATAGRAM_SIZE: usize = 8154;

/// Upper bound on chunks per message (the total field is a single byte).
pub const MAX_CHUNK_COUNT: usize = 255;

/// Default UDP port for GELF collectors.
pub const DEFAULT_PORT: u16 = 12201;
