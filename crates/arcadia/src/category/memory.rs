//! An in-memory category store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{Category, CategoryId, CategoryStore};
use crate::error::StoreError;

struct StoreState {
    categories: BTreeMap<CategoryId, Category>,
    next_id: u64,
}

/// A [`CategoryStore`] kept in memory. Ids are assigned sequentially from 1.
pub struct InMemoryCategoryStore {
    state: Mutex<StoreState>,
}

impl Default for InMemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCategoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                categories: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored categories.
    pub fn len(&self) -> usize {
        self.state.lock().categories.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().categories.is_empty()
    }

    /// Look up a category by id.
    pub fn get(&self, id: CategoryId) -> Option<Category> {
        self.state.lock().categories.get(&id).cloned()
    }
}

impl CategoryStore for InMemoryCategoryStore {
    fn categories(&self) -> Vec<Category> {
        self.state.lock().categories.values().cloned().collect()
    }

    fn add_category(&self, name: &str, search: &str) -> Result<CategoryId, StoreError> {
        let mut state = self.state.lock();
        if state.categories.values().any(|c| c.name == name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let id = CategoryId::from(state.next_id);
        state.next_id += 1;
        state
            .categories
            .insert(id, Category::saved(id, name, search));
        Ok(id)
    }

    fn redefine_category(
        &self,
        id: CategoryId,
        name: &str,
        search: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state
            .categories
            .values()
            .any(|c| c.name == name && c.id != Some(id))
        {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        let category = state
            .categories
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        category.name = name.to_string();
        category.search = search.to_string();
        Ok(())
    }

    fn remove_category(&self, id: CategoryId) -> Result<(), StoreError> {
        self.state
            .lock()
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn contains_name(&self, name: &str) -> bool {
        self.state.lock().categories.values().any(|c| c.name == name)
    }
}

impl std::fmt::Debug for InMemoryCategoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCategoryStore")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_sequential_ids() {
        let store = InMemoryCategoryStore::new();
        let a = store.add_category("RPG", "genre:rpg").unwrap();
        let b = store.add_category("Strategy", "").unwrap();
        assert_eq!(a.as_u64(), 1);
        assert_eq!(b.as_u64(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a).unwrap().search, "genre:rpg");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let store = InMemoryCategoryStore::new();
        let rpg = store.add_category("RPG", "").unwrap();
        let other = store.add_category("Shooters", "").unwrap();

        assert_eq!(
            store.add_category("RPG", "x"),
            Err(StoreError::DuplicateName("RPG".into()))
        );
        assert_eq!(
            store.redefine_category(other, "RPG", ""),
            Err(StoreError::DuplicateName("RPG".into()))
        );
        // Keeping its own name is fine.
        store.redefine_category(rpg, "RPG", "genre:rpg").unwrap();
    }

    #[test]
    fn test_remove_and_missing_ids() {
        let store = InMemoryCategoryStore::new();
        let id = store.add_category("RPG", "").unwrap();
        store.remove_category(id).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.remove_category(id), Err(StoreError::NotFound(id)));
        assert_eq!(
            store.redefine_category(id, "RPG", ""),
            Err(StoreError::NotFound(id))
        );
        assert!(!store.contains_name("RPG"));
    }
}
