//! gelf-cli - Command-line interface for sending GELF messages
//!
//! Sends one-shot messages, forwards stdin, or previews how a message
//! would be framed on the wire.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use gelf_client::{Compression, Level, WriterConfig};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gelf-cli")]
#[command(about = "Send log messages to a GELF collector over UDP")]
#[command(version)]
struct Cli {
    /// Collector address
    #[arg(short, long, env = "GELF_ADDRESS", default_value = "127.0.0.1:12201")]
    address: String,

    /// Host name reported in records (detected when omitted)
    #[arg(long, env = "GELF_HOST")]
    host: Option<String>,

    /// GELF facility
    #[arg(long, env = "GELF_FACILITY")]
    facility: Option<String>,

    /// Severity (name or 0-7)
    #[arg(short, long, default_value = "info")]
    level: Level,

    /// Maximum datagram size in bytes
    #[arg(long, default_value_t = gelf_protocol::DEFAULT_MAX_DATAGRAM_SIZE)]
    chunk_size: usize,

    /// Compression: zlib, gzip or none
    #[arg(long, default_value = "zlib")]
    compression: Compression,

    /// Extra field as key=value (repeatable)
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    fields: Vec<(String, Value)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Send a single message
    Send {
        /// Message text (use \n for a multi-line message)
        message: String,
    },

    /// Send each line read from stdin as its own message
    Pipe,

    /// Show how a message would be framed without sending it
    Plan {
        /// Message text
        message: String,
    },
}

/// Parses `key=value`, reading numbers and booleans as such.
fn parse_field(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err("field key must not be empty".to_string());
    }
    let value = match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::from(raw)),
    };
    Ok((key.to_string(), value))
}

fn build_config(cli: &Cli) -> WriterConfig {
    let mut config = WriterConfig::new(cli.address.clone());
    config.host = cli.host.clone();
    config.facility = cli.facility.clone();
    config.level = cli.level;
    config.max_datagram_size = cli.chunk_size;
    config.compression = cli.compression;
    // Records sent from the CLI have no meaningful Rust call site.
    config.resolve_caller = false;
    for (key, value) in &cli.fields {
        config.fields.insert(key.clone(), value.clone());
    }
    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    match commands::execute(config, cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
