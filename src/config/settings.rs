use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default byte count for both high-water marks (16 KiB).
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Settings as they appear in a config file or on the command line.
///
/// Every field is optional so that sources can be layered with
/// [`merge_settings`](super::merge_settings) before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSettings {
    #[serde(default, alias = "readFileName")]
    pub read_file_name: Option<PathBuf>,
    #[serde(default, alias = "writeFileName")]
    pub write_file_name: Option<PathBuf>,
    #[serde(default, alias = "writableHighWaterMark")]
    pub writable_high_water_mark: Option<usize>,
    #[serde(default, alias = "readableHighWaterMark")]
    pub readable_high_water_mark: Option<usize>,
}

/// Validated construction parameters of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Path opened read-only as the data source.
    pub read_file_name: PathBuf,
    /// Path opened write/create/truncate as the data sink.
    pub write_file_name: PathBuf,
    /// Pending write bytes above which the buffer is flushed.
    pub writable_high_water_mark: usize,
    /// Size of each read request when the reader does not ask for one.
    pub readable_high_water_mark: usize,
}

impl BridgeConfig {
    /// Create a config for the two paths with default high-water marks.
    pub fn new(read_file_name: impl Into<PathBuf>, write_file_name: impl Into<PathBuf>) -> Self {
        Self {
            read_file_name: read_file_name.into(),
            write_file_name: write_file_name.into(),
            writable_high_water_mark: DEFAULT_HIGH_WATER_MARK,
            readable_high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }

    pub fn with_writable_high_water_mark(mut self, bytes: usize) -> Self {
        self.writable_high_water_mark = bytes;
        self
    }

    pub fn with_readable_high_water_mark(mut self, bytes: usize) -> Self {
        self.readable_high_water_mark = bytes;
        self
    }

    /// Reject zero thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.writable_high_water_mark == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "writable_high_water_mark",
            });
        }
        if self.readable_high_water_mark == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "readable_high_water_mark",
            });
        }
        Ok(())
    }
}

impl TryFrom<BridgeSettings> for BridgeConfig {
    type Error = ConfigError;

    fn try_from(settings: BridgeSettings) -> Result<Self, Self::Error> {
        let read_file_name = settings
            .read_file_name
            .ok_or(ConfigError::Missing("read_file_name"))?;
        let write_file_name = settings
            .write_file_name
            .ok_or(ConfigError::Missing("write_file_name"))?;

        let config = BridgeConfig {
            read_file_name,
            write_file_name,
            writable_high_water_mark: settings
                .writable_high_water_mark
                .unwrap_or(DEFAULT_HIGH_WATER_MARK),
            readable_high_water_mark: settings
                .readable_high_water_mark
                .unwrap_or(DEFAULT_HIGH_WATER_MARK),
        };
        config.validate()?;
        Ok(config)
    }
}
