//! GELF writer.

use crate::caller::{self, Caller};
use crate::config::WriterConfig;
use crate::error::WriterError;
use crate::host;
use crate::transport::UdpTransport;
use gelf_protocol::{Chunker, Encoder, Level, LogRecord, RecordBuilder};
use std::io;
use std::net::SocketAddr;
use std::panic::Location;

/// Sends log messages to a GELF collector over UDP.
///
/// A writer can be shared between threads. Every write builds its own record
/// and datagrams; only the socket is shared.
pub struct Writer {
    transport: UdpTransport,
    encoder: Encoder,
    chunker: Chunker,
    defaults: RecordBuilder,
    level: Level,
    resolve_caller: bool,
}

impl Writer {
    /// Creates a writer for `addr` with default settings.
    pub fn new(addr: &str) -> Result<Self, WriterError> {
        Self::with_config(WriterConfig::new(addr))
    }

    pub fn with_config(config: WriterConfig) -> Result<Self, WriterError> {
        if config.address.trim().is_empty() {
            return Err(WriterError::InvalidAddress("address is empty".to_string()));
        }
        config
            .validate()
            .map_err(|e| WriterError::Config(e.to_string()))?;

        let transport = UdpTransport::connect(&config.address)?;
        let chunker = Chunker::new(config.max_datagram_size)?;
        let encoder = Encoder::new(config.compression).with_level(config.compression_level);

        let host = config.host.unwrap_or_else(host::hostname);
        let mut defaults = RecordBuilder::new(host).fields(config.fields);
        if let Some(facility) = config.facility {
            defaults = defaults.facility(facility);
        }

        tracing::debug!(
            destination = %transport.destination(),
            compression = %encoder.compression(),
            max_datagram_size = chunker.max_datagram_size(),
            "created GELF writer"
        );

        Ok(Self {
            transport,
            encoder,
            chunker,
            defaults,
            level: config.level,
            resolve_caller: config.resolve_caller,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.transport.destination()
    }

    /// Writes one message at the configured default level.
    ///
    /// Returns the length of `message`.
    #[track_caller]
    pub fn write(&self, message: &[u8]) -> Result<usize, WriterError> {
        self.write_at(self.level, message)
    }

    /// Writes one message at `level`.
    #[track_caller]
    pub fn write_at(&self, level: Level, message: &[u8]) -> Result<usize, WriterError> {
        let caller = if self.resolve_caller {
            caller::locate(Location::caller())
        } else {
            Caller::unknown()
        };
        self.write_with_caller(level, message, caller)
    }

    /// Writes one message with an explicitly supplied call site.
    pub fn write_with_caller(
        &self,
        level: Level,
        message: &[u8],
        caller: Caller,
    ) -> Result<usize, WriterError> {
        let record = self.record(level).caller(caller.file, caller.line).build(message);
        self.write_record(&record)?;
        Ok(message.len())
    }

    /// Returns a builder preloaded with this writer's host, facility and fields.
    pub fn record(&self, level: Level) -> RecordBuilder {
        self.defaults.clone().level(level)
    }

    /// Encodes, chunks and sends a prepared record.
    ///
    /// Returns the number of datagrams sent. Nothing is sent when encoding or
    /// chunking fails.
    pub fn write_record(&self, record: &LogRecord) -> Result<usize, WriterError> {
        let payload = self.encoder.encode(record)?;
        let len = payload.len();
        let datagrams = self.chunker.split(payload)?;
        let bytes = self.transport.send(&datagrams)?;

        tracing::debug!(
            payload_len = len,
            datagrams = datagrams.len(),
            bytes,
            level = record.level.as_u8(),
            "sent GELF message"
        );
        Ok(datagrams.len())
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
