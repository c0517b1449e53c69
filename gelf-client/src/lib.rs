//! # gelf-client
//!
//! Client library for sending GELF messages over UDP.
//!
//! This crate provides:
//! - A thread-safe [`Writer`] that builds, compresses, chunks and sends records
//! - Best-effort caller resolution for the `file` and `line` fields
//! - YAML and environment based writer configuration
//! - Line-oriented forwarding shared by the binaries

pub mod caller;
pub mod config;
pub mod error;
pub mod host;
pub mod ship;
pub mod transport;
pub mod writer;

pub use caller::Caller;
pub use config::{ConfigError, WriterConfig};
pub use error::WriterError;
pub use ship::{ship, Framing, ShipStats};
pub use gelf_protocol::{Compression, Level, LogRecord};
pub use transport::UdpTransport;
pub use writer::Writer;
