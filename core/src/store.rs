use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Persisted key for the serialized daily log.
pub const FOOD_ITEMS_KEY: &str = "foodItems";
/// Persisted key for the per-date total-calories mapping.
pub const HISTORICAL_DATA_KEY: &str = "historicalData";
/// Persisted key for the recipe mapping.
pub const RECIPES_KEY: &str = "recipes";
/// Persisted key for the string-encoded daily calorie goal.
pub const CALORIE_GOAL_KEY: &str = "calorieGoal";
/// Persisted key for the raw Gemini API key.
pub const GEMINI_API_KEY: &str = "geminiApiKey";
/// Persisted key for the raw Scira API key.
pub const SCIRA_API_KEY: &str = "sciraApiKey";
/// Persisted key for the serialized custom-keys toggle.
pub const USE_CUSTOM_KEYS_KEY: &str = "useCustomKeys";

/// Async, string-keyed, string-valued persistent store.
///
/// The state layer assumes the backing store serializes writes to the same
/// key in call order; later writes always carry the full up-to-date value,
/// so last-write-wins is then safe.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore: Clone {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and ephemeral use. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.remove(key);
        Ok(())
    }
}
