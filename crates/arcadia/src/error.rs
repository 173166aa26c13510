//! Error types for the Arcadia library layer.

use std::path::PathBuf;

use crate::category::CategoryId;

/// Result type alias for category operations.
pub type Result<T> = std::result::Result<T, CategoryError>;

/// Errors raised by a [`CategoryStore`](crate::CategoryStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No category has this id.
    #[error("No category with id {0}")]
    NotFound(CategoryId),

    /// Another category already uses this name.
    #[error("A category named '{0}' already exists")]
    DuplicateName(String),
}

/// Errors raised while saving or deleting a category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    /// The name is used internally and cannot be given to a category.
    #[error("'{0}' is a reserved category name.")]
    Reserved(String),

    /// The new name belongs to another category.
    #[error("'{0}' is already a category, and search-based categories can't be merged.")]
    Duplicate(String),

    /// The operation needs a category that has been saved.
    #[error("The category has not been saved yet")]
    NotSaved,

    /// The underlying store rejected the change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while loading a [`CategoryConfig`](crate::CategoryConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The contents are not valid TOML for this config.
    #[error("Invalid category config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
