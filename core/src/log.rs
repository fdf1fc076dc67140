use chrono::{Local, NaiveDate};

use crate::error::{Result, TrackerError};
use crate::history::History;
use crate::models::{
    EntryState, FoodEntry, LOG_SCHEMA_VERSION, StoredLog, parse_stored_log, total_calories,
};
use crate::recipes::{RECIPE_MARKER, RecipeLibrary};
use crate::resolver::{FoodResolver, ResolvedFood};
use crate::store::{FOOD_ITEMS_KEY, KeyValueStore};

/// Claim on a pending lookup. Only the holder of the current ticket may
/// transition the entry out of Loading; results from a superseded dispatch
/// carry a stale generation and are discarded.
#[derive(Debug, Clone)]
pub struct LookupTicket {
    pub id: String,
    pub name: String,
    pub generation: u64,
}

/// Result of an add-food request.
#[derive(Debug)]
pub enum AddOutcome {
    /// Input was blank after trimming; nothing happened.
    Ignored,
    /// A `@recipe` reference was cloned and appended, already resolved.
    RecipeAdded(FoodEntry),
    /// A Loading entry was appended; the caller must run the lookup and
    /// report back through [`FoodLog::complete_lookup`].
    Pending(LookupTicket),
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// The day's food log: entry lifecycle, totals, and persistence.
///
/// Every successful mutation rewrites the full log under `foodItems` and
/// recomputes today's historical total. Persistence failures are logged
/// and do not roll back in-memory state; the next successful write
/// converges the store again.
pub struct FoodLog<S: KeyValueStore> {
    store: S,
    history: History<S>,
    entries: Vec<FoodEntry>,
    today: Clock,
}

impl<S: KeyValueStore> FoodLog<S> {
    /// Load the persisted log, using the local calendar date as "today".
    pub async fn load(store: S) -> Self {
        Self::load_with_clock(store, Box::new(|| Local::now().date_naive())).await
    }

    /// Load with an injected date provider. Missing or corrupt data yields
    /// an empty log; the caller never sees the failure.
    pub async fn load_with_clock(store: S, today: Clock) -> Self {
        let entries = match store.get(FOOD_ITEMS_KEY).await {
            Ok(Some(raw)) => match parse_stored_log(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("corrupt food log, starting empty: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("failed to read food log, starting empty: {e}");
                Vec::new()
            }
        };
        let history = History::new(store.clone());
        Self {
            store,
            history,
            entries,
            today,
        }
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FoodEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Find an entry by unambiguous id prefix (CLI convenience).
    #[must_use]
    pub fn find_by_id_prefix(&self, prefix: &str) -> Option<&FoodEntry> {
        let mut matches = self.entries.iter().filter(|e| e.id.starts_with(prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Sum over resolved entries, recomputed on demand.
    #[must_use]
    pub fn total_calories(&self) -> u32 {
        total_calories(&self.entries)
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Add a food by name.
    ///
    /// Blank input is ignored. A `@name` reference clones the recipe with a
    /// fresh id and appends it resolved, with no lookup; an unknown recipe
    /// raises [`TrackerError::RecipeNotFound`] and leaves the log unchanged.
    /// Any other name appends a Loading entry and returns a ticket for the
    /// asynchronous lookup, dispatched with the raw name as typed.
    pub async fn add_food(
        &mut self,
        name: &str,
        recipes: &RecipeLibrary<S>,
    ) -> Result<AddOutcome> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(AddOutcome::Ignored);
        }

        if let Some(reference) = trimmed.strip_prefix(RECIPE_MARKER) {
            let entry = recipes.clone_entry(reference).await?;
            self.entries.push(entry.clone());
            self.persist().await;
            return Ok(AddOutcome::RecipeAdded(entry));
        }

        let entry = FoodEntry::loading(name);
        let ticket = LookupTicket {
            id: entry.id.clone(),
            name: name.to_string(),
            generation: entry.generation,
        };
        self.entries.push(entry);
        self.persist().await;
        Ok(AddOutcome::Pending(ticket))
    }

    /// Apply a lookup outcome: Loading -> Resolved on success (the resolver
    /// may canonicalize the name), Loading -> Failed on error.
    ///
    /// Returns false when the result was discarded: the entry is gone
    /// (cleared), no longer Loading, or the ticket's dispatch was
    /// superseded by a retry.
    pub async fn complete_lookup(
        &mut self,
        ticket: &LookupTicket,
        outcome: Result<ResolvedFood>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == ticket.id) else {
            return false;
        };
        if entry.generation != ticket.generation || !matches!(entry.state, EntryState::Loading) {
            return false;
        }

        match outcome {
            Ok(food) => {
                entry.name = food.food;
                entry.state = EntryState::Resolved {
                    calories: food.calories,
                    ingredients: food.ingredients,
                    sources: food.sources,
                };
            }
            Err(e) => {
                entry.state = EntryState::Failed {
                    error: e.to_string(),
                };
            }
        }
        self.persist().await;
        true
    }

    /// Run the lookup for a pending ticket and apply its outcome.
    pub async fn resolve_pending<R: FoodResolver>(
        &mut self,
        ticket: &LookupTicket,
        resolver: &R,
    ) -> bool {
        let outcome = resolver.resolve(&ticket.name).await;
        self.complete_lookup(ticket, outcome).await
    }

    /// Re-dispatch a failed entry: Failed -> Loading under a new generation.
    /// Returns `None` when no such entry exists or it is not retryable
    /// (only Failed entries are).
    pub async fn retry(&mut self, id: &str) -> Option<LookupTicket> {
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        if !entry.is_failed() {
            return None;
        }
        entry.generation += 1;
        entry.state = EntryState::Loading;
        let ticket = LookupTicket {
            id: entry.id.clone(),
            name: entry.name.clone(),
            generation: entry.generation,
        };
        self.persist().await;
        Some(ticket)
    }

    /// Empty the log and write a zero total for today.
    pub async fn clear_all(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.remove(FOOD_ITEMS_KEY).await {
            tracing::error!("failed to clear food log: {e}");
        }
        if let Err(e) = self.history.write_total((self.today)(), 0).await {
            tracing::error!("failed to reset today's total: {e}");
        }
    }

    // Rewrite the full log and today's derived total. Failures are logged,
    // never surfaced: in-memory state stays authoritative until the next
    // successful write.
    async fn persist(&self) {
        let stored = StoredLog {
            version: LOG_SCHEMA_VERSION,
            entries: self.entries.clone(),
        };
        match serde_json::to_string(&stored) {
            Ok(raw) => {
                if let Err(e) = self.store.set(FOOD_ITEMS_KEY, &raw).await {
                    tracing::error!("failed to persist food log: {e}");
                }
            }
            Err(e) => tracing::error!("failed to serialize food log: {e}"),
        }
        if let Err(e) = self.history.recompute((self.today)(), &self.entries).await {
            tracing::error!("failed to persist today's total: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ingredient;
    use crate::store::MemoryStore;

    const TODAY: &str = "2025-06-15";

    fn fixed_clock() -> Clock {
        Box::new(|| TODAY.parse().unwrap())
    }

    async fn empty_log(store: MemoryStore) -> FoodLog<MemoryStore> {
        FoodLog::load_with_clock(store, fixed_clock()).await
    }

    fn banana_response() -> ResolvedFood {
        ResolvedFood {
            food: "banana".to_string(),
            calories: 105,
            ingredients: vec![],
            sources: vec![],
        }
    }

    async fn pending_ticket(log: &mut FoodLog<MemoryStore>, name: &str) -> LookupTicket {
        let recipes = RecipeLibrary::new(MemoryStore::new());
        match log.add_food(name, &recipes).await.unwrap() {
            AddOutcome::Pending(ticket) => ticket,
            other => panic!("expected pending lookup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_banana_resolves_and_updates_history() {
        let store = MemoryStore::new();
        let mut log = empty_log(store.clone()).await;

        let ticket = pending_ticket(&mut log, "banana").await;
        assert!(matches!(log.entries()[0].state, EntryState::Loading));
        assert_eq!(log.total_calories(), 0);

        assert!(log.complete_lookup(&ticket, Ok(banana_response())).await);
        assert!(log.entries()[0].is_resolved());
        assert_eq!(log.total_calories(), 105);

        let day = log.history().get_by_date(TODAY.parse().unwrap()).await.unwrap();
        assert_eq!(day.total_calories, 105);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let store = MemoryStore::new();
        let mut log = empty_log(store.clone()).await;
        let recipes = RecipeLibrary::new(store);

        assert!(matches!(
            log.add_food("   ", &recipes).await.unwrap(),
            AddOutcome::Ignored
        ));
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_total_over_mixed_outcomes() {
        let store = MemoryStore::new();
        let mut log = empty_log(store).await;

        let t1 = pending_ticket(&mut log, "banana").await;
        let t2 = pending_ticket(&mut log, "mystery stew").await;
        let t3 = pending_ticket(&mut log, "omelet").await;

        // Resolutions complete out of order; log order stays insertion order.
        log.complete_lookup(
            &t3,
            Ok(ResolvedFood {
                food: "omelet".to_string(),
                calories: 300,
                ingredients: vec![],
                sources: vec![],
            }),
        )
        .await;
        log.complete_lookup(&t1, Ok(banana_response())).await;
        log.complete_lookup(&t2, Err(TrackerError::Resolution("food not found".to_string())))
            .await;

        assert_eq!(log.total_calories(), 405);
        let names: Vec<&str> = log.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["banana", "mystery stew", "omelet"]);
        assert!(log.entries()[1].is_failed());
    }

    #[tokio::test]
    async fn test_recipe_reference_appends_clone_without_lookup() {
        let store = MemoryStore::new();
        let recipes = RecipeLibrary::new(store.clone());
        let omelet = FoodEntry {
            state: EntryState::Resolved {
                calories: 300,
                ingredients: vec![Ingredient {
                    name: "egg".to_string(),
                    calories: 155,
                }],
                sources: vec![],
            },
            ..FoodEntry::loading("Omelet")
        };
        recipes.save(&omelet).await.unwrap();

        let mut log = empty_log(store).await;
        let outcome = log.add_food("@OMELET", &recipes).await.unwrap();

        let AddOutcome::RecipeAdded(entry) = outcome else {
            panic!("expected recipe clone");
        };
        assert_ne!(entry.id, omelet.id);
        assert_eq!(entry.calories(), 300);
        assert_eq!(log.total_calories(), 300);
    }

    #[tokio::test]
    async fn test_missing_recipe_leaves_log_unchanged() {
        let store = MemoryStore::new();
        let recipes = RecipeLibrary::new(store.clone());
        let mut log = empty_log(store).await;

        let err = log.add_food("@omelet", &recipes).await.unwrap_err();
        assert!(matches!(err, TrackerError::RecipeNotFound(name) if name == "omelet"));
        assert!(log.entries().is_empty());
        assert_eq!(log.total_calories(), 0);
    }

    #[tokio::test]
    async fn test_clear_all_zeroes_today() {
        let store = MemoryStore::new();
        let mut log = empty_log(store.clone()).await;
        let ticket = pending_ticket(&mut log, "banana").await;
        log.complete_lookup(&ticket, Ok(banana_response())).await;

        log.clear_all().await;

        assert!(log.entries().is_empty());
        let day = log.history().get_by_date(TODAY.parse().unwrap()).await.unwrap();
        assert_eq!(day.total_calories, 0);
        // The persisted log itself is gone.
        assert!(store.get(FOOD_ITEMS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_late_result_after_clear_is_discarded() {
        let store = MemoryStore::new();
        let mut log = empty_log(store).await;
        let ticket = pending_ticket(&mut log, "banana").await;

        log.clear_all().await;

        assert!(!log.complete_lookup(&ticket, Ok(banana_response())).await);
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_retry_only_failed_entries() {
        let store = MemoryStore::new();
        let mut log = empty_log(store).await;
        let ticket = pending_ticket(&mut log, "banana").await;
        let id = ticket.id.clone();

        // Loading entries are not retryable.
        assert!(log.retry(&id).await.is_none());

        log.complete_lookup(&ticket, Err(TrackerError::Resolution("timeout".to_string())))
            .await;
        let retry = log.retry(&id).await.unwrap();
        assert!(matches!(log.get(&id).unwrap().state, EntryState::Loading));

        log.complete_lookup(&retry, Ok(banana_response())).await;
        assert_eq!(log.total_calories(), 105);

        // Resolved entries are terminal.
        assert!(log.retry(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let store = MemoryStore::new();
        let mut log = empty_log(store).await;
        let original = pending_ticket(&mut log, "banana").await;
        let id = original.id.clone();

        log.complete_lookup(&original, Err(TrackerError::Resolution("timeout".to_string())))
            .await;
        let retry = log.retry(&id).await.unwrap();

        // A straggler response from the first dispatch arrives after the
        // retry re-entered Loading; it must not win.
        let stale = ResolvedFood {
            food: "stale banana".to_string(),
            calories: 999,
            ingredients: vec![],
            sources: vec![],
        };
        assert!(!log.complete_lookup(&original, Ok(stale)).await);
        assert!(matches!(log.get(&id).unwrap().state, EntryState::Loading));

        assert!(log.complete_lookup(&retry, Ok(banana_response())).await);
        assert_eq!(log.total_calories(), 105);
    }

    #[tokio::test]
    async fn test_log_survives_reload() {
        let store = MemoryStore::new();
        {
            let mut log = empty_log(store.clone()).await;
            let ticket = pending_ticket(&mut log, "banana").await;
            log.complete_lookup(&ticket, Ok(banana_response())).await;
        }

        let log = empty_log(store).await;
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.total_calories(), 105);
    }

    #[tokio::test]
    async fn test_corrupt_log_loads_empty() {
        let store = MemoryStore::new();
        store.set(FOOD_ITEMS_KEY, "{{{").await.unwrap();
        let log = empty_log(store).await;
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_log_migrates_on_load() {
        let store = MemoryStore::new();
        store
            .set(
                FOOD_ITEMS_KEY,
                r#"[{"id":"0.7","name":"banana","calories":105}]"#,
            )
            .await
            .unwrap();
        let log = empty_log(store.clone()).await;
        assert_eq!(log.total_calories(), 105);
    }

    #[tokio::test]
    async fn test_find_by_id_prefix() {
        let store = MemoryStore::new();
        let mut log = empty_log(store).await;
        let ticket = pending_ticket(&mut log, "banana").await;

        let prefix = &ticket.id[..8];
        assert_eq!(log.find_by_id_prefix(prefix).unwrap().id, ticket.id);
        assert!(log.find_by_id_prefix("zzzz").is_none());
    }
}
