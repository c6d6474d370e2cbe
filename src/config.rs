pub mod settings;

pub use settings::{BridgeConfig, BridgeSettings, DEFAULT_HIGH_WATER_MARK};

use crate::error::ConfigError;
use std::path::Path;

/// Parse settings from TOML text.
///
/// Both the snake_case field names and the camelCase option names
/// (`readFileName`, `writableHighWaterMark`, ...) are accepted.
pub fn parse_settings(content: &str) -> Result<BridgeSettings, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<BridgeSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!(
        target: "duplex_bridge::config",
        "Loaded settings from {}",
        path.display()
    );
    parse_settings(&content)
}

/// Merge two BridgeSettings, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<BridgeSettings>,
    primary: Option<BridgeSettings>,
) -> Option<BridgeSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(BridgeSettings {
            read_file_name: primary.read_file_name.or(fallback.read_file_name),
            write_file_name: primary.write_file_name.or(fallback.write_file_name),
            writable_high_water_mark: primary
                .writable_high_water_mark
                .or(fallback.writable_high_water_mark),
            readable_high_water_mark: primary
                .readable_high_water_mark
                .or(fallback.readable_high_water_mark),
        }),
    }
}
