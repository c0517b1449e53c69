//! Hostname detection.

use std::env;

/// Returns the host name reported in records.
///
/// Tries `GELF_HOST`, then `HOSTNAME`, then the system hostname, and falls
/// back to `"unknown"`.
pub fn hostname() -> String {
    for var in ["GELF_HOST", "HOSTNAME"] {
        if let Ok(name) = env::var(var) {
            if !name.is_empty() {
                return name;
            }
        }
    }

    match nix::unistd::gethostname() {
        Ok(name) => {
            if let Some(name) = name.to_str() {
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        Err(e) => {
            tracing::warn!("failed to get system hostname: {}", e);
        }
    }

    tracing::warn!("could not determine hostname, using 'unknown'");
    "unknown".to_string()
}
