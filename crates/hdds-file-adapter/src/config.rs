// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Adapter configuration.
//!
//! Supports both file-based (TOML) and property-set configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Type name announced when a stream does not specify one.
pub const DEFAULT_TYPE_NAME: &str = "ShapeType";

/// Property key suffix holding a stream's backing file.
pub const FILE_PATH_PROPERTY: &str = "file_path";

/// Property key suffix holding a stream's registered type name.
pub const TYPE_NAME_PROPERTY: &str = "type_name";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Flat key/value property set, as handed over by a routing engine.
///
/// Keys have the form `<stream_name>.file_path` or `<stream_name>.type_name`.
pub type PropertySet = BTreeMap<String, String>;

/// Top-level file adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Engine settings.
    #[serde(default)]
    pub adapter: AdapterSettings,

    /// File-backed streams, in discovery order.
    #[serde(default)]
    pub streams: Vec<StreamSource>,
}

/// Engine settings (polling cadence and sample pacing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// Adapter name (for identification).
    #[serde(default = "default_adapter_name")]
    pub name: String,

    /// Discovery polling interval (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay between two reads of a stream's file (milliseconds).
    #[serde(default = "default_sample_period")]
    pub sample_period_ms: u64,

    /// Samples read per period.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_adapter_name() -> String {
    "hdds-file-adapter".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_sample_period() -> u64 {
    100
}

fn default_batch_size() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_type_name() -> String {
    DEFAULT_TYPE_NAME.to_string()
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            name: default_adapter_name(),
            poll_interval_ms: default_poll_interval(),
            sample_period_ms: default_sample_period(),
            batch_size: default_batch_size(),
            log_level: default_log_level(),
        }
    }
}

impl AdapterSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}

/// One file-backed stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSource {
    /// Stream name announced through discovery.
    pub stream_name: String,

    /// Backing file.
    pub file_path: PathBuf,

    /// Registered type name.
    #[serde(default = "default_type_name")]
    pub type_name: String,
}

impl StreamSource {
    /// Create a source with the default type name.
    pub fn new(stream_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            stream_name: stream_name.into(),
            file_path: file_path.into(),
            type_name: default_type_name(),
        }
    }

    /// Set the registered type name.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

impl AdapterConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from a flat property set.
    ///
    /// Streams are ordered by name since property sets carry no order.
    pub fn from_properties(properties: &PropertySet) -> Result<Self, ConfigError> {
        let mut paths: BTreeMap<&str, &str> = BTreeMap::new();
        let mut types: BTreeMap<&str, &str> = BTreeMap::new();

        for (key, value) in properties {
            let (stream, field) = key.rsplit_once('.').ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Property '{}' is not of the form <stream>.<field>",
                    key
                ))
            })?;

            match field {
                FILE_PATH_PROPERTY => {
                    paths.insert(stream, value);
                }
                TYPE_NAME_PROPERTY => {
                    types.insert(stream, value);
                }
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "Unknown property field '{}' in '{}'",
                        other, key
                    )));
                }
            }
        }

        if let Some(stream) = types.keys().find(|s| !paths.contains_key(*s)) {
            return Err(ConfigError::Invalid(format!(
                "Stream '{}' has a type_name but no file_path",
                stream
            )));
        }

        let streams = paths
            .into_iter()
            .map(|(stream, path)| {
                let source = StreamSource::new(stream, path);
                match types.get(stream) {
                    Some(type_name) => source.type_name(*type_name),
                    None => source,
                }
            })
            .collect();

        let config = Self {
            streams,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streams.is_empty() {
            return Err(ConfigError::Invalid("No streams configured".into()));
        }

        if self.adapter.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }

        if self.adapter.poll_interval_ms == 0 || self.adapter.sample_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms and sample_period_ms must be non-zero".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (i, stream) in self.streams.iter().enumerate() {
            if stream.stream_name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Stream {} has an empty name",
                    i
                )));
            }
            if stream.file_path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Stream '{}' has an empty file_path",
                    stream.stream_name
                )));
            }
            if stream.type_name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Stream '{}' has an empty type_name",
                    stream.stream_name
                )));
            }
            if !seen.insert(stream.stream_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Stream '{}' is configured twice",
                    stream.stream_name
                )));
            }
        }

        Ok(())
    }

    /// Add a stream.
    pub fn add_stream(&mut self, stream: StreamSource) {
        self.streams.push(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> PropertySet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_properties() {
        let config = AdapterConfig::from_properties(&props(&[
            ("Square.file_path", "square.csv"),
            ("Circle.file_path", "circle.csv"),
            ("Circle.type_name", "CircleType"),
        ]))
        .expect("valid properties");

        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.streams[0].stream_name, "Circle");
        assert_eq!(config.streams[0].type_name, "CircleType");
        assert_eq!(config.streams[1].stream_name, "Square");
        assert_eq!(config.streams[1].type_name, DEFAULT_TYPE_NAME);
        assert_eq!(config.streams[1].file_path, PathBuf::from("square.csv"));
    }

    #[test]
    fn test_from_properties_dotted_stream_name() {
        let config =
            AdapterConfig::from_properties(&props(&[("shapes.Square.file_path", "sq.csv")]))
                .expect("valid properties");
        assert_eq!(config.streams[0].stream_name, "shapes.Square");
    }

    #[test]
    fn test_from_properties_rejects_bad_keys() {
        assert!(AdapterConfig::from_properties(&props(&[("nodot", "x")])).is_err());
        assert!(AdapterConfig::from_properties(&props(&[("Square.color", "BLUE")])).is_err());
        assert!(AdapterConfig::from_properties(&props(&[("Square.type_name", "T")])).is_err());
        assert!(AdapterConfig::from_properties(&props(&[("Square.file_path", "")])).is_err());
        assert!(AdapterConfig::from_properties(&PropertySet::new()).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = AdapterConfig::default();
        assert!(config.validate().is_err()); // No streams

        config.add_stream(StreamSource::new("Square", "square.csv"));
        assert!(config.validate().is_ok());

        config.add_stream(StreamSource::new("Square", "other.csv"));
        assert!(config.validate().is_err()); // Duplicate

        config.streams.pop();
        config.add_stream(StreamSource::new("", "circle.csv"));
        assert!(config.validate().is_err()); // Empty name

        config.streams.pop();
        config.adapter.batch_size = 0;
        assert!(config.validate().is_err());

        config.adapter.batch_size = 1;
        config.adapter.sample_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_defaults() {
        let config: AdapterConfig = toml::from_str(
            r#"
            [[streams]]
            stream_name = "Triangle"
            file_path = "triangle.csv"
            "#,
        )
        .expect("parse");

        assert_eq!(config.adapter.name, "hdds-file-adapter");
        assert_eq!(config.adapter.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.adapter.batch_size, 1);
        assert_eq!(config.streams[0].type_name, DEFAULT_TYPE_NAME);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AdapterConfig::default();
        config.add_stream(StreamSource::new("Square", "square.csv"));
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("stream_name = \"Square\""));
        assert!(toml_str.contains("poll_interval_ms = 1000"));
    }
}
