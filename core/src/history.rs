use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{FoodEntry, total_calories};
use crate::store::{HISTORICAL_DATA_KEY, KeyValueStore};

/// Persisted per-date snapshot of a day's total calories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    #[serde(rename = "totalCalories")]
    pub total_calories: u32,
}

/// Derives and persists the per-calendar-day total-calories mapping.
///
/// The entry for a given date is rewritten wholesale from the current log
/// on every mutation; entries for past dates are immutable snapshots
/// written while that date was "today".
pub struct History<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> History<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recompute the total for `date` from `entries` and persist it.
    /// Idempotent: repeated calls with the same log write identical state.
    pub async fn recompute(&self, date: NaiveDate, entries: &[FoodEntry]) -> Result<()> {
        self.write_total(date, total_calories(entries)).await
    }

    /// Overwrite the stored total for `date`.
    pub async fn write_total(&self, date: NaiveDate, total: u32) -> Result<()> {
        let mut map = self.read_map().await;
        map.insert(
            date.format("%Y-%m-%d").to_string(),
            DayTotal {
                total_calories: total,
            },
        );
        let raw = serde_json::to_string(&map)?;
        self.store.set(HISTORICAL_DATA_KEY, &raw).await
    }

    /// Point lookup by date. `None` means "no record", which is distinct
    /// from a stored zero-calorie day.
    pub async fn get_by_date(&self, date: NaiveDate) -> Option<DayTotal> {
        let map = self.read_map().await;
        map.get(&date.format("%Y-%m-%d").to_string()).copied()
    }

    /// The full mapping, ordered by date string, for the calendar view.
    pub async fn all(&self) -> BTreeMap<String, DayTotal> {
        self.read_map().await
    }

    // Read failures and corrupt data fall back to an empty mapping; the
    // next successful write repairs the record for the current date.
    async fn read_map(&self) -> BTreeMap<String, DayTotal> {
        let raw = match self.store.get(HISTORICAL_DATA_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!("failed to read historical data, starting empty: {e}");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!("corrupt historical data, starting empty: {e}");
                BTreeMap::new()
            }
        }
    }
}
