//! Category configuration, loaded from TOML.
//!
//! ```toml
//! default_name = "New Category"
//! reserved_names = ["all", "favorite", "uncategorized"]
//! ```
//!
//! Missing keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name given to a category the user has not named yet.
pub const DEFAULT_CATEGORY_NAME: &str = "New Category";

/// Settings for category naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Name given to new, unnamed categories.
    pub default_name: String,
    /// Names used internally; compared case-insensitively.
    pub reserved_names: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_CATEGORY_NAME.to_string(),
            reserved_names: vec!["all".to_string(), "favorite".to_string()],
        }
    }
}

impl CategoryConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            target: "arcadia::config",
            path = %path.display(),
            reserved = config.reserved_names.len(),
            "loaded category config"
        );
        Ok(config)
    }

    /// Set the default name.
    pub fn default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Add a reserved name.
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved_names.push(name.into());
        self
    }
}
