//! Encoder and decoder for GELF payloads.
//!
//! A payload is a JSON-serialized [`LogRecord`] wrapped in a compression
//! container. Receivers pick the container by its leading magic bytes.

use crate::error::ProtocolError;
use crate::record::LogRecord;
use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Magic bytes of a zlib stream at the default compression level.
pub const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9c];

/// Magic bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Levels whose zlib header is exactly [`ZLIB_MAGIC`].
///
/// zlib records a level class in the second header byte, so levels 0-3 and 9
/// would change the magic receivers look for.
pub const COMPRESSION_LEVELS: RangeInclusive<u32> = 4..=8;

/// Compression container applied to serialized records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Zlib,
    Gzip,
    /// Uncompressed JSON. The payload starts with `{` rather than a
    /// compression magic, so only receivers that sniff raw JSON accept it.
    None,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Zlib => write!(f, "zlib"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::None => write!(f, "none"),
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zlib" => Ok(Compression::Zlib),
            "gzip" => Ok(Compression::Gzip),
            "none" | "raw" => Ok(Compression::None),
            other => Err(format!("unknown compression: {}", other)),
        }
    }
}

/// Serializes and compresses records.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    compression: Compression,
    level: u32,
}

impl Encoder {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Sets the compression level, clamped to [`COMPRESSION_LEVELS`].
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.clamp(*COMPRESSION_LEVELS.start(), *COMPRESSION_LEVELS.end());
        self
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Encodes a record into a compressed payload.
    pub fn encode(&self, record: &LogRecord) -> Result<Bytes, ProtocolError> {
        record.validate()?;
        let json = serde_json::to_vec(record)?;
        self.compress(&json)
    }

    /// Compresses serialized bytes with the configured container.
    pub fn compress(&self, data: &[u8]) -> Result<Bytes, ProtocolError> {
        let level = flate2::Compression::new(self.level);
        let out = match self.compression {
            Compression::Zlib => {
                let mut enc = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level);
                enc.write_all(data).map_err(ProtocolError::Compression)?;
                enc.finish().map_err(ProtocolError::Compression)?
            }
            Compression::Gzip => {
                let mut enc = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), level);
                enc.write_all(data).map_err(ProtocolError::Compression)?;
                enc.finish().map_err(ProtocolError::Compression)?
            }
            Compression::None => data.to_vec(),
        };
        Ok(Bytes::from(out))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

/// Decodes payloads back into records.
pub struct Decoder;

impl Decoder {
    /// Detects the container from the leading bytes.
    pub fn detect(data: &[u8]) -> Result<Compression, ProtocolError> {
        match data {
            [0x1f, 0x8b, ..] => Ok(Compression::Gzip),
            [0x78, b, ..] if (0x7800 | u16::from(*b)) % 31 == 0 => Ok(Compression::Zlib),
            [b'{', ..] => Ok(Compression::None),
            [a, b, ..] => Err(ProtocolError::UnknownMagic([*a, *b])),
            [a] => Err(ProtocolError::UnknownMagic([*a, 0])),
            [] => Err(ProtocolError::UnknownMagic([0, 0])),
        }
    }

    /// Inflates a payload into its serialized JSON bytes.
    pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(data.len() * 4);
        match Self::detect(data)? {
            Compression::Gzip => {
                GzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(ProtocolError::Decompression)?;
            }
            Compression::Zlib => {
                ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(ProtocolError::Decompression)?;
            }
            Compression::None => out.extend_from_slice(data),
        }
        Ok(out)
    }

    /// Decodes a complete payload into a record.
    pub fn decode(data: &[u8]) -> Result<LogRecord, ProtocolError> {
        let json = Self::decompress(data)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
