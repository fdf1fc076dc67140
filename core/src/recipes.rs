use std::collections::HashMap;

use crate::error::{Result, TrackerError};
use crate::models::{FoodEntry, parse_stored_recipes};
use crate::store::{KeyValueStore, RECIPES_KEY};

/// Prefix marking a log input as a recipe reference (`@omelet`).
pub const RECIPE_MARKER: char = '@';

/// Canonical recipe key: trimmed and lower-cased. Applied identically on
/// every write and read path.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name-keyed collection of previously resolved foods, persisted as one
/// mapping under the `recipes` key.
pub struct RecipeLibrary<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RecipeLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Save `entry` under its normalized name, overwriting any existing
    /// recipe with that key. Returns the key used.
    pub async fn save(&self, entry: &FoodEntry) -> Result<String> {
        let key = normalize_name(&entry.name);
        let mut map = self.read_map().await;
        map.insert(key.clone(), entry.clone());
        let raw = serde_json::to_string(&map)?;
        self.store.set(RECIPES_KEY, &raw).await?;
        Ok(key)
    }

    /// Look up a recipe by (any-case, any-whitespace) name.
    pub async fn get(&self, name: &str) -> Option<FoodEntry> {
        let map = self.read_map().await;
        map.get(&normalize_name(name)).cloned()
    }

    /// Copy of the stored recipe under a freshly generated id.
    pub async fn clone_entry(&self, name: &str) -> Result<FoodEntry> {
        let key = normalize_name(name);
        self.get(&key)
            .await
            .map(|entry| entry.with_new_id())
            .ok_or(TrackerError::RecipeNotFound(key))
    }

    /// Recipe names containing `query` as a substring (autocomplete).
    /// An empty query returns every saved name. Sorted for stable output;
    /// the mapping itself has no defined order.
    pub async fn find_matching(&self, query: &str) -> Vec<String> {
        let query = normalize_name(query);
        let map = self.read_map().await;
        let mut names: Vec<String> = if query.is_empty() {
            map.into_keys().collect()
        } else {
            map.into_keys().filter(|name| name.contains(&query)).collect()
        };
        names.sort();
        names
    }

    /// Every saved recipe, keyed by normalized name.
    pub async fn all(&self) -> HashMap<String, FoodEntry> {
        self.read_map().await
    }

    async fn read_map(&self) -> HashMap<String, FoodEntry> {
        let raw = match self.store.get(RECIPES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                tracing::warn!("failed to read recipes, starting empty: {e}");
                return HashMap::new();
            }
        };
        match parse_stored_recipes(&raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("corrupt recipe data, starting empty: {e}");
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryState, Ingredient};
    use crate::store::MemoryStore;

    fn omelet() -> FoodEntry {
        FoodEntry {
            state: EntryState::Resolved {
                calories: 300,
                ingredients: vec![Ingredient {
                    name: "egg".to_string(),
                    calories: 155,
                }],
                sources: vec!["https://example.com".to_string()],
            },
            ..FoodEntry::loading("Omelet")
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Omelet "), "omelet");
        assert_eq!(normalize_name("FRIED RICE"), "fried rice");
        assert_eq!(normalize_name(""), "");
    }

    #[tokio::test]
    async fn test_save_and_clone_roundtrip() {
        let library = RecipeLibrary::new(MemoryStore::new());
        let entry = omelet();

        let key = library.save(&entry).await.unwrap();
        assert_eq!(key, "omelet");

        // Any case and surrounding whitespace resolves to the same recipe.
        let clone = library.clone_entry(" OMELET ").await.unwrap();
        assert_ne!(clone.id, entry.id);
        assert_eq!(clone.name, entry.name);
        assert_eq!(clone.state, entry.state);
    }

    #[tokio::test]
    async fn test_clone_missing_recipe() {
        let library = RecipeLibrary::new(MemoryStore::new());
        let err = library.clone_entry("omelet").await.unwrap_err();
        assert!(matches!(err, TrackerError::RecipeNotFound(name) if name == "omelet"));
    }

    #[tokio::test]
    async fn test_save_overwrites_same_key() {
        let library = RecipeLibrary::new(MemoryStore::new());
        library.save(&omelet()).await.unwrap();

        let updated = FoodEntry {
            state: EntryState::Resolved {
                calories: 350,
                ingredients: vec![],
                sources: vec![],
            },
            ..FoodEntry::loading("omelet")
        };
        library.save(&updated).await.unwrap();

        let stored = library.get("omelet").await.unwrap();
        assert_eq!(stored.calories(), 350);
        assert_eq!(library.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_matching_substring() {
        let library = RecipeLibrary::new(MemoryStore::new());
        for name in ["fried rice", "rice pudding", "omelet"] {
            let entry = FoodEntry {
                state: EntryState::Resolved {
                    calories: 100,
                    ingredients: vec![],
                    sources: vec![],
                },
                ..FoodEntry::loading(name)
            };
            library.save(&entry).await.unwrap();
        }

        // Substring containment, not just prefix.
        assert_eq!(
            library.find_matching("rice").await,
            vec!["fried rice", "rice pudding"]
        );
        // Empty query returns everything.
        assert_eq!(
            library.find_matching("").await,
            vec!["fried rice", "omelet", "rice pudding"]
        );
        // Query is itself normalized.
        assert_eq!(library.find_matching(" RICE ").await.len(), 2);
        assert!(library.find_matching("pizza").await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_recipes_recover_empty() {
        let store = MemoryStore::new();
        store.set(RECIPES_KEY, "[[[").await.unwrap();
        let library = RecipeLibrary::new(store);

        assert!(library.get("omelet").await.is_none());
        library.save(&omelet()).await.unwrap();
        assert!(library.get("omelet").await.is_some());
    }
}
