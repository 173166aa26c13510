//! Library-wide notification sources.

use std::sync::Arc;

use arcadia_core::{IdleScheduler, NotificationSource, SourceConfig};

use crate::category::CategoryId;

/// What changed in the category list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChange {
    /// A category was created.
    Added { id: CategoryId, name: String },
    /// A category's name or search was changed.
    Redefined {
        id: CategoryId,
        old_name: String,
        name: String,
    },
    /// A category was deleted.
    Removed { id: CategoryId, name: String },
}

impl CategoryChange {
    /// The id of the affected category.
    pub fn id(&self) -> CategoryId {
        match self {
            Self::Added { id, .. } | Self::Redefined { id, .. } | Self::Removed { id, .. } => *id,
        }
    }
}

/// The notification sources the library fires.
///
/// Both are delivered through the same scheduler, so subscribers see category
/// and library changes in the order they were fired.
#[derive(Debug, Clone)]
pub struct LibraryEvents {
    /// Fired after every category change.
    pub categories_changed: NotificationSource<CategoryChange>,
    /// Fired when the game list needs refreshing, including after every
    /// category change.
    pub library_changed: NotificationSource<()>,
}

impl LibraryEvents {
    /// Create the sources over one scheduler.
    pub fn new(scheduler: Arc<dyn IdleScheduler>) -> Self {
        Self {
            categories_changed: NotificationSource::with_config(
                scheduler.clone(),
                SourceConfig::named("categories_changed"),
            ),
            library_changed: NotificationSource::with_config(
                scheduler,
                SourceConfig::named("library_changed"),
            ),
        }
    }

    /// Announce a category change, then ask for the game list to refresh.
    pub fn notify(&self, change: CategoryChange) {
        self.categories_changed.fire(change);
        self.library_changed.fire(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcadia_core::ManualScheduler;
    use parking_lot::Mutex;

    #[test]
    fn test_sources_share_scheduler_order() {
        let scheduler = Arc::new(ManualScheduler::new());
        let events = LibraryEvents::new(scheduler.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        let category_log = log.clone();
        events
            .categories_changed
            .register(move |change| category_log.lock().push(format!("{:?}", change.id())));
        let library_log = log.clone();
        events
            .library_changed
            .register(move |_| library_log.lock().push("library".to_string()));

        events.categories_changed.fire(CategoryChange::Removed {
            id: CategoryId::from(3),
            name: "RPG".into(),
        });
        events.library_changed.fire(());

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(
            *log.lock(),
            vec!["CategoryId(3)".to_string(), "library".to_string()]
        );
        assert_eq!(events.categories_changed.name(), "categories_changed");
    }

    #[test]
    fn test_notify_refreshes_library_after_change() {
        let scheduler = Arc::new(ManualScheduler::new());
        let events = LibraryEvents::new(scheduler.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        let category_log = log.clone();
        events
            .categories_changed
            .register(move |_| category_log.lock().push("category"));
        let library_log = log.clone();
        events
            .library_changed
            .register(move |_| library_log.lock().push("library"));

        events.notify(CategoryChange::Added {
            id: CategoryId::from(1),
            name: "Shooters".into(),
        });

        assert_eq!(events.library_changed.generation_number(), 1);
        scheduler.run_pending();
        assert_eq!(*log.lock(), vec!["category", "library"]);
    }
}
