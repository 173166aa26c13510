//! Search-based game categories.
//!
//! A category is a named, saved search. This module holds the data types,
//! the naming rules, and the [`CategoryStore`] trait that persistence
//! backends implement.

mod editor;
mod memory;

use std::fmt;

use crate::config::CategoryConfig;
use crate::error::StoreError;

pub use editor::{CategoryEditor, DeletePrompt, SaveOutcome};
pub use memory::InMemoryCategoryStore;

/// Identifier assigned by a [`CategoryStore`] when a category is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(u64);

impl CategoryId {
    /// Get the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for CategoryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named search over the game library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// `None` until the category has been saved.
    pub id: Option<CategoryId>,
    pub name: String,
    pub search: String,
}

impl Category {
    /// A category that has not been saved, with the configured default name
    /// and an empty search.
    pub fn new_unsaved(config: &CategoryConfig) -> Self {
        Self {
            id: None,
            name: config.default_name.clone(),
            search: String::new(),
        }
    }

    /// A category as loaded from a store.
    pub fn saved(id: CategoryId, name: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            search: search.into(),
        }
    }

    /// Whether the category exists in a store.
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

/// Persistence for categories.
///
/// Implementations must be safe to share between threads; the editor calls
/// them from whatever thread runs the save.
pub trait CategoryStore: Send + Sync {
    /// All categories, ordered by id.
    fn categories(&self) -> Vec<Category>;

    /// Store a new category and return its id.
    fn add_category(&self, name: &str, search: &str) -> Result<CategoryId, StoreError>;

    /// Replace the name and search of an existing category.
    fn redefine_category(&self, id: CategoryId, name: &str, search: &str)
    -> Result<(), StoreError>;

    /// Delete a category.
    fn remove_category(&self, id: CategoryId) -> Result<(), StoreError>;

    /// Check if any category has exactly this name.
    fn contains_name(&self, name: &str) -> bool {
        self.categories().iter().any(|c| c.name == name)
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn strip_category_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `name` cannot be used for a user category.
///
/// Empty names, names starting with `.`, and the configured reserved names
/// (ignoring case) are reserved.
pub fn is_reserved_category(name: &str, config: &CategoryConfig) -> bool {
    name.is_empty()
        || name.starts_with('.')
        || config
            .reserved_names
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Canonical text for a search query, so equal searches compare equal.
pub fn normalize_search(search: &str) -> String {
    search.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_category_name() {
        assert_eq!(strip_category_name("  Point   and  Click "), "Point and Click");
        assert_eq!(strip_category_name("RPG"), "RPG");
        assert_eq!(strip_category_name(" \t "), "");
    }

    #[test]
    fn test_reserved_names() {
        let config = CategoryConfig::default();
        assert!(is_reserved_category("all", &config));
        assert!(is_reserved_category("Favorite", &config));
        assert!(is_reserved_category(".hidden", &config));
        assert!(is_reserved_category("", &config));
        assert!(!is_reserved_category("Strategy", &config));
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search("  installed:true   runner:wine "), "installed:true runner:wine");
        assert_eq!(normalize_search(""), "");
    }

    #[test]
    fn test_new_unsaved_uses_configured_name() {
        let config = CategoryConfig::default().default_name("Untitled");
        let category = Category::new_unsaved(&config);
        assert_eq!(category.name, "Untitled");
        assert!(!category.is_saved());
        assert!(category.search.is_empty());
    }
}
