//! Forwarding line-oriented input.
//!
//! Both binaries ship stdin through [`ship`], so they share one policy:
//! a message that cannot be delivered is logged and counted, and the stream
//! continues. Only failing to read the input stops shipping.

use crate::error::WriterError;
use crate::writer::Writer;
use std::io::BufRead;

/// How input lines map to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Every non-empty line is its own message.
    Lines,
    /// Lines starting with whitespace continue the previous message, so
    /// stack traces arrive as one multi-line record.
    FoldIndented,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipStats {
    pub sent: usize,
    pub dropped: usize,
}

/// Forwards messages until `input` is exhausted.
pub fn ship<R: BufRead>(
    writer: &Writer,
    input: R,
    framing: Framing,
) -> Result<ShipStats, WriterError> {
    let mut stats = ShipStats::default();
    let mut pending = String::new();

    for line in input.lines() {
        let line = line?;
        if framing == Framing::FoldIndented && is_continuation(&line) && !pending.is_empty() {
            pending.push('\n');
            pending.push_str(&line);
            continue;
        }
        deliver(writer, &mut pending, &mut stats);
        pending = line;
    }
    deliver(writer, &mut pending, &mut stats);

    Ok(stats)
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn deliver(writer: &Writer, pending: &mut String, stats: &mut ShipStats) {
    if pending.trim().is_empty() {
        pending.clear();
        return;
    }

    match writer.write(pending.as_bytes()) {
        Ok(_) => stats.sent += 1,
        Err(e) => {
            if e.is_pre_send() {
                tracing::warn!("Dropping message: {}", e);
            } else {
                // Receivers discard the orphaned chunks after their timeout
                tracing::warn!("Message partially sent: {}", e);
            }
            stats.dropped += 1;
        }
    }
    pending.clear();
}
