//! Converter configuration
//!
//! Target types and data locations used while lowering a query. Loaded from a
//! JSON file; every field has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::{ScalarType, TimestampType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Table holding the raw samples read by selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    pub database: String,
    pub table: String,
}

impl Default for TableName {
    fn default() -> Self {
        Self {
            database: "default".to_string(),
            table: "prometheus".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Type of sample values in generated queries
    pub scalar_type: ScalarType,
    /// Decimal scale of timestamps (3 = milliseconds)
    pub timestamp_scale: u32,
    /// Timezone attached to the timestamp type
    pub timezone: Option<String>,
    /// Source of raw samples
    pub time_series_table: TableName,
    /// How far back an instant selector looks for the latest sample
    pub lookback_delta_ms: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            scalar_type: ScalarType::Float64,
            timestamp_scale: 3,
            timezone: None,
            time_series_table: TableName::default(),
            lookback_delta_ms: 5 * 60 * 1000, // 5m
        }
    }
}

impl ConverterConfig {
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timestamp_scale > 9 {
            return Err(ConfigError::Invalid(format!(
                "timestamp_scale must be between 0 and 9, got {}",
                self.timestamp_scale
            )));
        }
        if self.time_series_table.table.is_empty() {
            return Err(ConfigError::Invalid(
                "time_series_table.table cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timestamp_type(&self) -> TimestampType {
        let ty = TimestampType::new(self.timestamp_scale);
        match &self.timezone {
            Some(tz) => ty.with_timezone(tz.clone()),
            None => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.scalar_type, ScalarType::Float64);
        assert_eq!(config.timestamp_type().name(), "DateTime64(3)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scalar_type": "Float32", "timestamp_scale": 6, "timezone": "UTC"}}"#
        )
        .unwrap();

        let config = ConverterConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scalar_type, ScalarType::Float32);
        assert_eq!(config.timestamp_type().name(), "DateTime64(6, 'UTC')");
        assert_eq!(config.lookback_delta_ms, 300_000);
        assert_eq!(config.time_series_table, TableName::default());
    }

    #[test]
    fn test_invalid_scale() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"timestamp_scale": 12}}"#).unwrap();

        assert!(matches!(
            ConverterConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            ConverterConfig::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
