// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model configuration, stored as RON.

use crate::error::ConfigError;
use crate::registry::DEFAULT_CATEGORY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Settings of a graph model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Format version
    pub version: u32,
    /// Remember cycle-check results until the next structural change
    pub memoize_cycle_checks: bool,
    /// Category for delegates registered without one
    pub default_category: String,
    /// When loading, apply connections into input port 0 before the others
    pub load_input_zero_first: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            memoize_cycle_checks: true,
            default_category: DEFAULT_CATEGORY.to_string(),
            load_input_zero_first: true,
        }
    }
}

impl GraphConfig {
    /// Parse settings from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = ron::from_str(text)?;
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Render settings as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
