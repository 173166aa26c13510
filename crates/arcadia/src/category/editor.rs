//! The save and delete workflow for one category.

use super::{Category, CategoryId, is_reserved_category, normalize_search, strip_category_name};
use crate::error::{CategoryError, Result};
use crate::events::CategoryChange;
use crate::library::Library;

/// What [`CategoryEditor::save`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new category was stored under this id.
    Created(CategoryId),
    /// An existing category's name or search changed.
    Redefined,
    /// Nothing differed from the stored category; the store was not touched.
    Unchanged,
}

/// Text for the confirmation asked before deleting a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub title: String,
    pub question: String,
}

/// Edits one category against a [`Library`].
///
/// The editor remembers the category as it was last saved. Each successful
/// change fires [`LibraryEvents::categories_changed`](crate::LibraryEvents)
/// followed by `library_changed`, since the game list filtered by the
/// category needs refreshing.
pub struct CategoryEditor<'a> {
    library: &'a Library,
    category: Category,
}

impl<'a> CategoryEditor<'a> {
    /// Start editing `category`. A blank name is replaced by the configured
    /// default name.
    pub fn new(library: &'a Library, mut category: Category) -> Self {
        if category.name.is_empty() {
            category.name = library.config().default_name.clone();
        }
        Self { library, category }
    }

    /// The category as last saved.
    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Window title for the editor.
    pub fn title(&self) -> String {
        format!("Configure {}", self.category.name)
    }

    /// Only saved categories can be deleted.
    pub fn can_delete(&self) -> bool {
        self.category.is_saved()
    }

    /// Apply the user's input.
    ///
    /// The name is stripped and a blank name keeps the old one. The search is
    /// normalized before comparing.
    ///
    /// # Errors
    ///
    /// - [`CategoryError::Reserved`] if the name is reserved
    /// - [`CategoryError::Duplicate`] if another category has the name
    /// - [`CategoryError::Store`] if the store rejects the change
    pub fn save(&mut self, name_input: &str, search_input: &str) -> Result<SaveOutcome> {
        let old_name = self.category.name.clone();
        let mut new_name = strip_category_name(name_input);
        if new_name.is_empty() {
            new_name = old_name.clone();
        }
        let new_search = normalize_search(search_input);

        if is_reserved_category(&new_name, self.library.config()) {
            return Err(CategoryError::Reserved(new_name));
        }

        let store = self.library.store();
        let claims_name = !self.category.is_saved() || old_name != new_name;
        if claims_name && store.contains_name(&new_name) {
            return Err(CategoryError::Duplicate(new_name));
        }

        let (outcome, change) = match self.category.id {
            None => {
                let id = store.add_category(&new_name, &new_search)?;
                self.category.id = Some(id);
                (
                    SaveOutcome::Created(id),
                    CategoryChange::Added {
                        id,
                        name: new_name.clone(),
                    },
                )
            }
            Some(id) if old_name != new_name || self.category.search != new_search => {
                store.redefine_category(id, &new_name, &new_search)?;
                (
                    SaveOutcome::Redefined,
                    CategoryChange::Redefined {
                        id,
                        old_name,
                        name: new_name.clone(),
                    },
                )
            }
            Some(_) => return Ok(SaveOutcome::Unchanged),
        };

        tracing::info!(
            target: "arcadia::category",
            id = %change.id(),
            name = %new_name,
            ?outcome,
            "category saved"
        );
        self.category.name = new_name;
        self.category.search = new_search;
        self.library.events().notify(change);
        Ok(outcome)
    }

    /// The confirmation to show before [`delete`](Self::delete).
    pub fn delete_prompt(&self) -> DeletePrompt {
        DeletePrompt {
            title: format!(
                "Do you want to delete the category '{}'?",
                self.category.name
            ),
            question: "This will permanently destroy the category, but the games themselves \
                       will not be deleted."
                .to_string(),
        }
    }

    /// Delete the category if the user confirmed.
    ///
    /// Returns `Ok(false)` without touching the store when not confirmed.
    /// After a deletion the editor holds an unsaved copy of the category.
    ///
    /// # Errors
    ///
    /// [`CategoryError::NotSaved`] for a category that was never saved, or
    /// [`CategoryError::Store`] if the store rejects the removal.
    pub fn delete(&mut self, confirmed: bool) -> Result<bool> {
        if !confirmed {
            return Ok(false);
        }
        let id = self.category.id.ok_or(CategoryError::NotSaved)?;
        self.library.store().remove_category(id)?;
        self.category.id = None;

        tracing::info!(target: "arcadia::category", %id, name = %self.category.name, "category deleted");
        self.library.events().notify(CategoryChange::Removed {
            id,
            name: self.category.name.clone(),
        });
        Ok(true)
    }
}

impl std::fmt::Debug for CategoryEditor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryEditor")
            .field("category", &self.category)
            .finish()
    }
}
