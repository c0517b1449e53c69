//! Chunked datagram framing.
//!
//! Payloads that fit in one datagram are sent as-is. Larger payloads are
//! split into chunks, each prefixed with a 12-byte header:
//!
//! ```text
//! +--------+------------+----------+-------+------------------+
//! | magic  | message id | sequence | total | data             |
//! | 2 bytes| 8 bytes    | 1 byte   | 1 byte| <= size - 12     |
//! +--------+------------+----------+-------+------------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_CHUNK_COUNT;
use bytes::{BufMut, Bytes, BytesMut};
use rand::RngCore;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Magic bytes identifying a chunked datagram.
pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];

/// Size of the chunk header in bytes (2+8+1+1 = 12).
pub const CHUNK_HEADER_SIZE: usize = 12;

/// How long receivers keep incomplete messages around.
pub const DEFAULT_ASSEMBLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier shared by all chunks of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub [u8; 8]);

impl MessageId {
    /// Draws a fresh id from the thread-local RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Header carried by every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: MessageId,
    /// Zero-based index of this chunk.
    pub sequence: u8,
    /// Number of chunks in the message.
    pub total: u8,
}

impl ChunkHeader {
    /// Returns whether a datagram starts with the chunk magic.
    pub fn is_chunked(datagram: &[u8]) -> bool {
        datagram.starts_with(&CHUNK_MAGIC)
    }

    /// Writes the header into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&CHUNK_MAGIC);
        buf.put_slice(self.id.as_bytes());
        buf.put_u8(self.sequence);
        buf.put_u8(self.total);
    }

    /// Parses a chunk header, returning it along with the chunk data.
    pub fn decode(datagram: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        if datagram.len() < CHUNK_HEADER_SIZE {
            return Err(ProtocolError::TruncatedChunk {
                len: datagram.len(),
                needed: CHUNK_HEADER_SIZE,
            });
        }

        let magic = [datagram[0], datagram[1]];
        if magic != CHUNK_MAGIC {
            return Err(ProtocolError::InvalidChunkMagic(magic));
        }

        let mut id = [0u8; 8];
        id.copy_from_slice(&datagram[2..10]);
        let sequence = datagram[10];
        let total = datagram[11];

        if total == 0 || sequence >= total {
            return Err(ProtocolError::InvalidSequence { sequence, total });
        }

        Ok((
            Self {
                id: MessageId(id),
                sequence,
                total,
            },
            &datagram[CHUNK_HEADER_SIZE..],
        ))
    }
}

/// Splits payloads into datagrams no larger than a fixed size.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_datagram_size: usize,
}

impl Chunker {
    pub fn new(max_datagram_size: usize) -> Result<Self, ProtocolError> {
        if max_datagram_size <= CHUNK_HEADER_SIZE {
            return Err(ProtocolError::DatagramTooSmall {
                size: max_datagram_size,
                min: CHUNK_HEADER_SIZE,
            });
        }
        Ok(Self { max_datagram_size })
    }

    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// Bytes of payload carried by each chunk.
    pub fn chunk_data_size(&self) -> usize {
        self.max_datagram_size - CHUNK_HEADER_SIZE
    }

    /// Returns how many datagrams a payload of `len` bytes needs.
    ///
    /// One means the payload goes out unchunked.
    pub fn plan(&self, len: usize) -> Result<usize, ProtocolError> {
        if len <= self.max_datagram_size {
            return Ok(1);
        }
        let needed = len.div_ceil(self.chunk_data_size());
        if needed > MAX_CHUNK_COUNT {
            return Err(ProtocolError::TooManyChunks {
                needed,
                max: MAX_CHUNK_COUNT,
            });
        }
        Ok(needed)
    }

    /// Splits a payload using a freshly generated message id.
    pub fn split(&self, payload: Bytes) -> Result<Vec<Bytes>, ProtocolError> {
        self.split_with_id(payload, MessageId::random())
    }

    /// Splits a payload with a caller-chosen message id.
    pub fn split_with_id(
        &self,
        payload: Bytes,
        id: MessageId,
    ) -> Result<Vec<Bytes>, ProtocolError> {
        let total = self.plan(payload.len())?;
        if payload.len() <= self.max_datagram_size {
            return Ok(vec![payload]);
        }

        let chunk_size = self.chunk_data_size();
        let mut datagrams = Vec::with_capacity(total);
        for (sequence, data) in payload.chunks(chunk_size).enumerate() {
            let mut buf = BytesMut::with_capacity(CHUNK_HEADER_SIZE + data.len());
            ChunkHeader {
                id,
                sequence: sequence as u8,
                total: total as u8,
            }
            .encode(&mut buf);
            buf.put_slice(data);
            datagrams.push(buf.freeze());
        }

        tracing::trace!(%id, total, len = payload.len(), "split payload into chunks");
        Ok(datagrams)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            max_datagram_size: crate::DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

struct PartialMessage {
    total: u8,
    parts: Vec<Option<Bytes>>,
    received: usize,
    first_seen: Instant,
}

impl PartialMessage {
    fn new(total: u8, now: Instant) -> Self {
        Self {
            total,
            parts: vec![None; total as usize],
            received: 0,
            first_seen: now,
        }
    }

    fn assemble(self) -> Bytes {
        let len: usize = self.parts.iter().flatten().map(Bytes::len).sum();
        let mut buf = BytesMut::with_capacity(len);
        for part in self.parts.into_iter().flatten() {
            buf.put_slice(&part);
        }
        buf.freeze()
    }
}

/// Reassembles chunked messages from datagrams arriving in any order.
pub struct ChunkAssembler {
    pending: HashMap<MessageId, PartialMessage>,
    timeout: Duration,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_ASSEMBLY_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Feeds one datagram.
    ///
    /// Returns the complete payload once every chunk of its message has been
    /// seen, `None` while chunks are still missing.
    pub fn accept(&mut self, datagram: &[u8]) -> Result<Option<Bytes>, ProtocolError> {
        self.accept_at(datagram, Instant::now())
    }

    pub fn accept_at(
        &mut self,
        datagram: &[u8],
        now: Instant,
    ) -> Result<Option<Bytes>, ProtocolError> {
        if !ChunkHeader::is_chunked(datagram) {
            return Ok(Some(Bytes::copy_from_slice(datagram)));
        }

        let (header, data) = ChunkHeader::decode(datagram)?;
        let partial = self
            .pending
            .entry(header.id)
            .or_insert_with(|| PartialMessage::new(header.total, now));

        if partial.total != header.total {
            return Err(ProtocolError::TotalMismatch {
                id: header.id.to_string(),
                expected: partial.total,
                actual: header.total,
            });
        }

        let slot = &mut partial.parts[header.sequence as usize];
        if slot.is_some() {
            tracing::trace!(id = %header.id, sequence = header.sequence, "duplicate chunk");
            return Ok(None);
        }
        *slot = Some(Bytes::copy_from_slice(data));
        partial.received += 1;

        if partial.received < partial.total as usize {
            return Ok(None);
        }

        Ok(self.pending.remove(&header.id).map(PartialMessage::assemble))
    }

    /// Drops incomplete messages older than the timeout.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let timeout = self.timeout;
        self.pending
            .retain(|_, partial| now.saturating_duration_since(partial.first_seen) < timeout);
        let purged = before - self.pending.len();
        if purged > 0 {
            tracing::warn!(purged, "dropped incomplete chunked messages");
        }
        purged
    }

    /// Number of messages still waiting for chunks.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new()
    }
}
