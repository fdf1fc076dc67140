use crate::error::Result;
use crate::models::{DEFAULT_GOAL, Settings, parse_goal};
use crate::store::{
    CALORIE_GOAL_KEY, GEMINI_API_KEY, KeyValueStore, SCIRA_API_KEY, USE_CUSTOM_KEYS_KEY,
};

/// Calorie goal and lookup credentials, persisted as four independent
/// records (no cross-key transaction).
pub struct SettingsStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load persisted settings. Each missing or unreadable field falls back
    /// to its default individually; the caller never sees a failure.
    pub async fn load(&self) -> Settings {
        let mut settings = Settings::default();

        if let Some(raw) = self.read(CALORIE_GOAL_KEY).await {
            match parse_goal(&raw) {
                Ok(goal) => settings.calorie_goal = goal,
                Err(_) => {
                    tracing::warn!("unparseable calorie goal '{raw}', using {DEFAULT_GOAL}");
                }
            }
        }
        if let Some(key) = self.read(GEMINI_API_KEY).await {
            settings.gemini_key = key;
        }
        if let Some(key) = self.read(SCIRA_API_KEY).await {
            settings.scira_key = key;
        }
        if let Some(raw) = self.read(USE_CUSTOM_KEYS_KEY).await {
            match serde_json::from_str::<bool>(&raw) {
                Ok(flag) => settings.use_custom_keys = flag,
                Err(_) => tracing::warn!("unparseable useCustomKeys '{raw}', using false"),
            }
        }

        settings
    }

    /// Validate and persist. Writes are four independent key-writes; any
    /// failure aborts the save and is surfaced to the caller (the explicit
    /// save is the one place storage errors reach the user).
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;

        self.store
            .set(CALORIE_GOAL_KEY, &settings.calorie_goal.to_string())
            .await?;
        self.store.set(GEMINI_API_KEY, &settings.gemini_key).await?;
        self.store.set(SCIRA_API_KEY, &settings.scira_key).await?;
        self.store
            .set(USE_CUSTOM_KEYS_KEY, &serde_json::to_string(&settings.use_custom_keys)?)
            .await?;
        Ok(())
    }

    /// Restore defaults. Credential keys are removed outright, not blanked.
    pub async fn reset_to_defaults(&self) -> Result<Settings> {
        let defaults = Settings::default();
        self.store
            .set(CALORIE_GOAL_KEY, &defaults.calorie_goal.to_string())
            .await?;
        self.store.remove(GEMINI_API_KEY).await?;
        self.store.remove(SCIRA_API_KEY).await?;
        self.store.set(USE_CUSTOM_KEYS_KEY, "false").await?;
        Ok(defaults)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("failed to read '{key}', using default: {e}");
                None
            }
        }
    }
}
