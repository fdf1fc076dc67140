use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrackerError};

/// One ingredient line of a resolved food's calorie breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub calories: u32,
}

/// Resolution lifecycle of a logged entry.
///
/// `Loading -> Resolved` on success, `Loading -> Failed` on error, and
/// `Failed -> Loading` on user retry. Resolved is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryState {
    Loading,
    Resolved {
        calories: u32,
        #[serde(default)]
        ingredients: Vec<Ingredient>,
        #[serde(default)]
        sources: Vec<String>,
    },
    Failed { error: String },
}

/// One logged food item with its resolution lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub state: EntryState,
    /// Bumped on every retry. A lookup result carrying an older generation
    /// is stale (its dispatch was superseded) and must be discarded.
    #[serde(skip)]
    pub generation: u64,
}

impl FoodEntry {
    /// A fresh entry awaiting resolution.
    #[must_use]
    pub fn loading(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            state: EntryState::Loading,
            generation: 0,
        }
    }

    /// Calorie contribution: only resolved entries count, others are 0.
    #[must_use]
    pub fn calories(&self) -> u32 {
        match &self.state {
            EntryState::Resolved { calories, .. } => *calories,
            EntryState::Loading | EntryState::Failed { .. } => 0,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, EntryState::Resolved { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed { .. })
    }

    /// Copy of this entry under a freshly generated id.
    #[must_use]
    pub fn with_new_id(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            generation: 0,
            ..self.clone()
        }
    }
}

/// Sum of calories over resolved entries; Loading/Failed contribute 0.
#[must_use]
pub fn total_calories(entries: &[FoodEntry]) -> u32 {
    entries.iter().map(FoodEntry::calories).sum()
}

pub const LOG_SCHEMA_VERSION: u32 = 1;

/// Persisted shape of the daily log.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredLog {
    pub version: u32,
    pub entries: Vec<FoodEntry>,
}

/// Loosely-typed entry shape written by older clients: flat optional
/// fields instead of a tagged status.
#[derive(Debug, Deserialize)]
struct LegacyEntry {
    id: String,
    name: String,
    #[serde(default)]
    calories: Option<u32>,
    #[serde(default)]
    ingredients: Option<Vec<Ingredient>>,
    #[serde(default)]
    sources: Option<Vec<String>>,
    #[serde(default)]
    loading: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl From<LegacyEntry> for FoodEntry {
    fn from(legacy: LegacyEntry) -> Self {
        let state = if let Some(error) = legacy.error {
            EntryState::Failed { error }
        } else if legacy.loading == Some(true) {
            EntryState::Loading
        } else if let Some(calories) = legacy.calories {
            EntryState::Resolved {
                calories,
                ingredients: legacy.ingredients.unwrap_or_default(),
                sources: legacy.sources.unwrap_or_default(),
            }
        } else {
            // No calories and not marked loading: a lookup that never
            // completed. Treat as still loading so a retry path exists.
            EntryState::Loading
        };
        Self {
            id: legacy.id,
            name: legacy.name,
            state,
            generation: 0,
        }
    }
}

/// Parse a persisted daily log, migrating the legacy bare-array shape on read.
pub fn parse_stored_log(raw: &str) -> Result<Vec<FoodEntry>> {
    if let Ok(stored) = serde_json::from_str::<StoredLog>(raw) {
        return Ok(stored.entries);
    }
    let legacy: Vec<LegacyEntry> = serde_json::from_str(raw)?;
    Ok(legacy.into_iter().map(FoodEntry::from).collect())
}

/// Parse a persisted recipe mapping, migrating legacy-shaped values on read.
pub fn parse_stored_recipes(raw: &str) -> Result<std::collections::HashMap<String, FoodEntry>> {
    if let Ok(map) = serde_json::from_str::<std::collections::HashMap<String, FoodEntry>>(raw) {
        return Ok(map);
    }
    let legacy: std::collections::HashMap<String, LegacyEntry> = serde_json::from_str(raw)?;
    Ok(legacy
        .into_iter()
        .map(|(k, v)| (k, FoodEntry::from(v)))
        .collect())
}

pub const GOAL_MIN: u32 = 500;
pub const GOAL_MAX: u32 = 10_000;
pub const DEFAULT_GOAL: u32 = 2_000;

/// User-configurable settings: daily goal and optional lookup credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub calorie_goal: u32,
    pub gemini_key: String,
    pub scira_key: String,
    pub use_custom_keys: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calorie_goal: DEFAULT_GOAL,
            gemini_key: String::new(),
            scira_key: String::new(),
            use_custom_keys: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.calorie_goal < GOAL_MIN || self.calorie_goal > GOAL_MAX {
            return Err(TrackerError::InvalidGoal);
        }
        if self.use_custom_keys {
            if self.gemini_key.trim().is_empty() {
                return Err(TrackerError::MissingCredential("Gemini"));
            }
            if self.scira_key.trim().is_empty() {
                return Err(TrackerError::MissingCredential("Scira"));
            }
        }
        Ok(())
    }

    /// Credentials to forward to the resolver, only when custom keys are
    /// enabled and both are present.
    #[must_use]
    pub fn resolver_keys(&self) -> Option<(&str, &str)> {
        if self.use_custom_keys && !self.gemini_key.is_empty() && !self.scira_key.is_empty() {
            Some((self.gemini_key.as_str(), self.scira_key.as_str()))
        } else {
            None
        }
    }
}

/// Parse a string-encoded calorie goal as persisted under `calorieGoal`.
pub fn parse_goal(raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| TrackerError::InvalidGoal)
}

/// Progress against the daily goal, as shown on the main screen.
#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub total: u32,
    pub goal: u32,
    /// Attainment percentage, capped at 100.
    pub percent: u32,
    pub over: bool,
    /// Calories remaining when under goal, calories over when above it.
    pub delta: u32,
}

impl GoalProgress {
    #[must_use]
    pub fn compute(total: u32, goal: u32) -> Self {
        let percent = if goal == 0 {
            100
        } else {
            ((u64::from(total) * 100 / u64::from(goal)).min(100)) as u32
        };
        let over = total > goal;
        let delta = if over { total - goal } else { goal - total };
        Self {
            total,
            goal,
            percent,
            over,
            delta,
        }
    }
}
