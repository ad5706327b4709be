//! User configuration for listeners, tooltips and pickers
//!
//! Read from `<config dir>/usd-props/config.json`. Every field is optional,
//! missing fields fall back to the values in [`crate::constants`].

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConfigError;

/// Tunables shared by the listener, the value models and the picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyConfig {
    /// Resynced prim paths must match this to refresh the listened models
    pub node_identifier_pattern: String,
    /// Max amount of values listed in a mixed-value tooltip
    pub tooltip_summary_limit: usize,
    /// Values rendered longer than this are listed one per line
    pub tooltip_separate_lines_threshold: usize,
    /// Extension filters of the USD file picker
    pub usd_file_extensions: Vec<String>,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            node_identifier_pattern: constants::listener::DEFAULT_NODE_IDENTIFIER_PATTERN.to_string(),
            tooltip_summary_limit: constants::tooltip::SUMMARY_LIMIT,
            tooltip_separate_lines_threshold: constants::tooltip::SEPARATE_LINES_THRESHOLD,
            usd_file_extensions: constants::picker::USD_FILE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl PropertyConfig {
    /// Location of the user config file, if the platform has a config directory
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(constants::APP_NAME).join(constants::CONFIG_FILE_NAME))
    }

    /// Load the user config, falling back to defaults when it's missing or broken
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load a config file, validating the node identifier pattern
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.node_identifier_regex()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn node_identifier_regex(&self) -> Result<Regex, ConfigError> {
        Ok(Regex::new(&self.node_identifier_pattern)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: PropertyConfig = serde_json::from_str(r#"{"tooltip_summary_limit": 3}"#).unwrap();
        assert_eq!(config.tooltip_summary_limit, 3);
        assert_eq!(
            config.node_identifier_pattern,
            constants::listener::DEFAULT_NODE_IDENTIFIER_PATTERN
        );
        assert_eq!(config.usd_file_extensions, vec!["usd", "usda", "usdc"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = PropertyConfig {
            tooltip_separate_lines_threshold: 4,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(PropertyConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"node_identifier_pattern": "(unclosed"}"#).unwrap();
        assert!(matches!(
            PropertyConfig::load_from(&path),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn test_default_pattern_matches_hashed_prims() {
        let regex = PropertyConfig::default().node_identifier_regex().unwrap();
        assert!(regex.is_match("/RootNode/meshes/mesh_0123456789ABCDEF"));
        assert!(regex.is_match("/RootNode/lights/light_0123456789ABCDEF_2"));
        assert!(!regex.is_match("/World/Cube"));
    }
}
