//! The library: a category store, its configuration and its notifications.

use std::sync::Arc;

use arcadia_core::IdleScheduler;

use crate::category::{Category, CategoryEditor, CategoryStore};
use crate::config::CategoryConfig;
use crate::events::LibraryEvents;

/// Ties a [`CategoryStore`] to the notification sources that announce its
/// changes.
pub struct Library {
    store: Arc<dyn CategoryStore>,
    events: LibraryEvents,
    config: CategoryConfig,
}

impl Library {
    /// Create a library whose notifications are delivered through
    /// `scheduler`.
    pub fn new(
        store: Arc<dyn CategoryStore>,
        scheduler: Arc<dyn IdleScheduler>,
        config: CategoryConfig,
    ) -> Self {
        Self {
            store,
            events: LibraryEvents::new(scheduler),
            config,
        }
    }

    pub fn store(&self) -> &dyn CategoryStore {
        &*self.store
    }

    pub fn events(&self) -> &LibraryEvents {
        &self.events
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// All stored categories.
    pub fn categories(&self) -> Vec<Category> {
        self.store.categories()
    }

    /// Start editing a category that does not exist yet.
    pub fn new_category_editor(&self) -> CategoryEditor<'_> {
        CategoryEditor::new(self, Category::new_unsaved(&self.config))
    }

    /// Start editing an existing category.
    pub fn edit_category(&self, category: Category) -> CategoryEditor<'_> {
        CategoryEditor::new(self, category)
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("events", &self.events)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
