// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph processing configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default upper bound on subgraph expansions per flatten call
pub const DEFAULT_MAX_EXPANSIONS: usize = 65_536;

/// Settings consulted by graph rewrites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Format version
    pub version: u32,
    /// Joins the implementation name and the subnode name when minting names
    /// for inlined nodes
    pub name_separator: String,
    /// Maximum number of reference nodes one flatten call may expand.
    /// Self-recursive implementations stop here instead of growing forever.
    pub max_expansions: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            name_separator: "_".to_string(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

impl GraphConfig {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        ron::ser::to_string_pretty(self, config)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Config version {} is newer than supported version {}",
                    config.version, CONFIG_FORMAT_VERSION
                ),
            ));
        }

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = self.to_ron().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
