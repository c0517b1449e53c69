//! gelf - Log shipper
//!
//! Reads log lines from stdin and forwards each one to a GELF collector over
//! UDP. Lines indented with whitespace are folded into the preceding message,
//! so stack traces arrive as a single multi-line record.

use gelf_client::{ship, Framing, Writer, WriterConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never mix with piped data
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if GELF_CONFIG is set, then env overrides)
    let mut config = match WriterConfig::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("GELF_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    // Shipped lines come from other programs; a Rust call site is meaningless.
    config.resolve_caller = false;

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    tracing::info!("Starting gelf shipper");
    tracing::info!("  Collector: {}", config.address);
    tracing::info!("  Compression: {}", config.compression);
    tracing::info!("  Max datagram size: {}", config.max_datagram_size);

    let writer = Writer::with_config(config)?;
    let stats = ship(&writer, std::io::stdin().lock(), Framing::FoldIndented)?;

    tracing::info!(
        "Stdin closed: {} messages sent, {} dropped",
        stats.sent,
        stats.dropped
    );
    Ok(())
}
