//! Writer configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via GELF_CONFIG or an explicit path)
//! 3. Environment variables

use gelf_protocol::chunk::CHUNK_HEADER_SIZE;
use gelf_protocol::codec::{COMPRESSION_LEVELS, DEFAULT_COMPRESSION_LEVEL};
use gelf_protocol::{Compression, Level, DEFAULT_MAX_DATAGRAM_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Writer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Collector address, `host:port`.
    pub address: String,
    /// Host reported in records. Detected when unset.
    pub host: Option<String>,
    /// Optional GELF facility.
    pub facility: Option<String>,
    /// Level applied by plain writes.
    #[serde(with = "level_serde")]
    pub level: Level,
    /// Largest datagram sent, header included.
    pub max_datagram_size: usize,
    /// Compression container.
    pub compression: Compression,
    /// Compression level (4-8, the range that keeps the zlib magic stable).
    pub compression_level: u32,
    /// Walk the stack to fill `file` and `line`.
    pub resolve_caller: bool,
    /// Extra fields added to every record.
    pub fields: BTreeMap<String, Value>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{}", gelf_protocol::DEFAULT_PORT),
            host: None,
            facility: None,
            level: Level::default(),
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            compression: Compression::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            resolve_caller: true,
            fields: BTreeMap::new(),
        }
    }
}

impl WriterConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("GELF_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WriterConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("GELF_ADDRESS") {
            if !addr.is_empty() {
                self.address = addr;
            }
        }

        if let Ok(host) = std::env::var("GELF_HOST") {
            if !host.is_empty() {
                self.host = Some(host);
            }
        }

        if let Ok(facility) = std::env::var("GELF_FACILITY") {
            if !facility.is_empty() {
                self.facility = Some(facility);
            }
        }

        if let Ok(level) = std::env::var("GELF_LEVEL") {
            if let Ok(parsed) = level.parse() {
                self.level = parsed;
            }
        }

        if let Ok(size) = std::env::var("GELF_CHUNK_SIZE") {
            match size.to_lowercase().as_str() {
                "wan" => self.max_datagram_size = DEFAULT_MAX_DATAGRAM_SIZE,
                "lan" => self.max_datagram_size = gelf_protocol::LAN_MAX_DATAGRAM_SIZE,
                s => {
                    if let Ok(n) = s.parse() {
                        self.max_datagram_size = n;
                    }
                }
            }
        }

        if let Ok(compression) = std::env::var("GELF_COMPRESSION") {
            if let Ok(parsed) = compression.parse() {
                self.compression = parsed;
            }
        }

        if let Ok(level) = std::env::var("GELF_COMPRESSION_LEVEL") {
            if let Ok(n) = level.parse() {
                self.compression_level = n;
            }
        }

        if let Ok(resolve) = std::env::var("GELF_RESOLVE_CALLER") {
            self.resolve_caller = resolve == "1" || resolve.to_lowercase() == "true";
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "address must not be empty".to_string(),
            ));
        }
        if self.max_datagram_size <= CHUNK_HEADER_SIZE {
            return Err(ConfigError::Validation(format!(
                "max_datagram_size must exceed {} bytes",
                CHUNK_HEADER_SIZE
            )));
        }
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(ConfigError::Validation(format!(
                "compression_level must be {}-{}, got {}",
                COMPRESSION_LEVELS.start(),
                COMPRESSION_LEVELS.end(),
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

/// Errors raised while loading or checking a writer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access writer config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed writer config '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid writer config: {0}")]
    Validation(String),
}

/// Levels are written as names in YAML and accept names or numbers.
mod level_serde {
    use gelf_protocol::Level;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&level.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Level::from_u8(n).map_err(serde::de::Error::custom),
            Raw::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WriterConfig::default();
        assert_eq!(config.address, "127.0.0.1:12201");
        assert_eq!(config.max_datagram_size, 1420);
        assert_eq!(config.compression, Compression::Zlib);
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.level, Level::Informational);
        assert!(config.resolve_caller);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut config = WriterConfig::new("");
        assert!(config.validate().is_err());

        config.address = "10.0.0.1:12201".to_string();
        config.max_datagram_size = 12;
        assert!(config.validate().is_err());

        config.max_datagram_size = 512;
        config.compression_level = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_level_range() {
        let mut config = WriterConfig::new("10.0.0.1:12201");
        for level in [0, 1, 3, 9] {
            config.compression_level = level;
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains("4-8"));
        }
        for level in 4..=8 {
            config.compression_level = level;
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = WriterConfig::new("graylog:12201");
        config.level = Level::Warning;
        config.fields.insert("_env".to_string(), Value::from("prod"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("level: warning"));
        let parsed: WriterConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.address, "graylog:12201");
        assert_eq!(parsed.level, Level::Warning);
        assert_eq!(parsed.fields["_env"], Value::from("prod"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gelf.yaml");
        std::fs::write(
            &path,
            "address: logs.internal:12201\nlevel: 3\ncompression: gzip\nfields:\n  _team: infra\n",
        )
        .unwrap();

        let config = WriterConfig::from_file(&path).unwrap();
        assert_eq!(config.address, "logs.internal:12201");
        assert_eq!(config.level, Level::Error);
        assert_eq!(config.compression, Compression::Gzip);
        assert_eq!(config.max_datagram_size, 1420);
        assert_eq!(config.fields["_team"], Value::from("infra"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "address: [unterminated\n").unwrap();

        let err = WriterConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("malformed writer config"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.yaml");
        let config = WriterConfig::new("127.0.0.1:5555");
        config.save(&path).unwrap();
        let loaded = WriterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.address, "127.0.0.1:5555");
    }

    #[test]
    fn test_missing_file() {
        let err = WriterConfig::from_file("/nonexistent/gelf.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/gelf.yaml"));
    }
}
