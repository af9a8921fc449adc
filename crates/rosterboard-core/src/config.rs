//! Tunable constants for layout, undo and persistence.
//!
//! Every field has a default, so a config file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid config {path}: {message}")]
    Parse { path: String, message: String },
}

/// Top-level board configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    pub layout: LayoutConfig,
    pub undo: UndoConfig,
    pub storage: StorageConfig,
}

impl BoardConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::debug!("config/loaded {}", path.display());
        Ok(config)
    }
}

/// Pixel constants driving container sizing and tile grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub tile_width: f64,
    pub tile_height: f64,
    pub grid_gap: f64,
    pub container_min_width: f64,
    pub container_min_height: f64,
    pub container_default_width: f64,
    pub container_default_height: f64,
    /// Height of the container title bar.
    pub container_header_height: f64,
    /// Height of a staff/newcomer section label.
    pub section_header_height: f64,
    pub section_border_padding: f64,
    /// Padding above and below the stacked sections.
    pub sections_vertical_padding: f64,
    pub section_gap: f64,
    /// Horizontal space a container spends on borders and padding.
    pub horizontal_buffer: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tile_width: 120.0,
            tile_height: 56.0,
            grid_gap: 8.0,
            container_min_width: 220.0,
            container_min_height: 160.0,
            container_default_width: 320.0,
            container_default_height: 220.0,
            container_header_height: 44.0,
            section_header_height: 24.0,
            section_border_padding: 18.0,
            sections_vertical_padding: 16.0,
            section_gap: 8.0,
            horizontal_buffer: 32.0,
        }
    }
}

/// Undo window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UndoConfig {
    pub max_entries: usize,
    pub ttl_ms: u64,
    /// How often the front end should poll for expiry.
    pub poll_interval_ms: u64,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            ttl_ms: 10_000,
            poll_interval_ms: 250,
        }
    }
}

impl UndoConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Persistence keys and autosave cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub key_prefix: String,
    pub version: u32,
    pub autosave_debounce_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: "rosterboard".to_string(),
            version: 1,
            autosave_debounce_ms: 500,
        }
    }
}

impl StorageConfig {
    /// Key holding the board envelope.
    pub fn board_key(&self) -> String {
        format!("{}:v{}", self.key_prefix, self.version)
    }

    /// Key holding the interaction mode.
    pub fn mode_key(&self) -> String {
        format!("{}:ui:v{}", self.key_prefix, self.version)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{"layout": {"tileWidth": 100}, "undo": {"ttlMs": 5000}}"#;
        let config = BoardConfig::from_json(json).unwrap();

        assert_eq!(config.layout.tile_width, 100.0);
        assert_eq!(config.layout.tile_height, LayoutConfig::default().tile_height);
        assert_eq!(config.undo.ttl(), Duration::from_secs(5));
        assert_eq!(config.undo.max_entries, 10);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_storage_keys() {
        let storage = StorageConfig::default();
        assert_eq!(storage.board_key(), "rosterboard:v1");
        assert_eq!(storage.mode_key(), "rosterboard:ui:v1");
    }

    #[test]
    fn test_missing_file() {
        let result = BoardConfig::from_file(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
