//! Command execution.

use crate::Commands;
use colored::Colorize;
use gelf_client::{host, ship, Framing, Writer, WriterConfig};
use gelf_protocol::{Chunker, Encoder, ProtocolError, RecordBuilder};

/// Executes a command and returns the formatted output.
pub fn execute(config: WriterConfig, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Send { message } => {
            let writer = Writer::with_config(config)?;
            let message = unescape(&message);
            let n = writer.write(message.as_bytes())?;
            Ok(format!(
                "{} {} bytes to {}",
                "Sent".green(),
                n,
                writer.destination().to_string().cyan()
            ))
        }

        Commands::Pipe => {
            let writer = Writer::with_config(config)?;
            let stats = ship(&writer, std::io::stdin().lock(), Framing::Lines)?;

            if stats.dropped > 0 {
                Ok(format!(
                    "{} {} messages ({} dropped)",
                    "Sent".green(),
                    stats.sent,
                    stats.dropped.to_string().yellow()
                ))
            } else {
                Ok(format!("{} {} messages", "Sent".green(), stats.sent))
            }
        }

        Commands::Plan { message } => plan(&config, &unescape(&message)),
    }
}

/// Describes the datagrams a message would produce.
fn plan(config: &WriterConfig, message: &str) -> Result<String, Box<dyn std::error::Error>> {
    config.validate()?;

    let host = config.host.clone().unwrap_or_else(host::hostname);
    let mut builder = RecordBuilder::new(host)
        .level(config.level)
        .fields(config.fields.clone());
    if let Some(facility) = &config.facility {
        builder = builder.facility(facility.clone());
    }
    let record = builder.build(message.as_bytes());

    let json_len = serde_json::to_vec(&record)?.len();
    let payload = Encoder::new(config.compression)
        .with_level(config.compression_level)
        .encode(&record)?;
    let chunker = Chunker::new(config.max_datagram_size)?;

    let mut output = String::new();
    output.push_str(&format!("{}\n", "Message plan".bold()));
    output.push_str(&format!("  short_message: {:?}\n", record.short));
    output.push_str(&format!(
        "  full_message:  {}\n",
        if record.full.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            format!("{} bytes", record.full.len())
        }
    ));
    output.push_str(&format!("  serialized:    {} bytes\n", json_len));
    output.push_str(&format!(
        "  compressed:    {} bytes ({})\n",
        payload.len(),
        config.compression
    ));

    match chunker.plan(payload.len()) {
        Ok(1) => output.push_str(&format!(
            "  datagrams:     1 ({})",
            "unchunked".green()
        )),
        Ok(n) => output.push_str(&format!(
            "  datagrams:     {} ({} of up to {} bytes)",
            n,
            "chunked".yellow(),
            chunker.max_datagram_size()
        )),
        Err(ProtocolError::TooManyChunks { needed, max }) => output.push_str(&format!(
            "  datagrams:     {} ({}: limit is {})",
            needed,
            "too large".red(),
            max
        )),
        Err(e) => return Err(e.into()),
    }

    Ok(output)
}

/// Expands `\n` and `\t` escapes typed on the command line.
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}
