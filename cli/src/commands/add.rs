use anyhow::{Context, Result};
use serde::Serialize;
use std::process;

use caltrack_core::error::TrackerError;
use caltrack_core::log::{AddOutcome, FoodLog};
use caltrack_core::models::{EntryState, FoodEntry};
use caltrack_core::recipes::RecipeLibrary;
use caltrack_core::settings::SettingsStore;

use super::helpers::{json_error, short_id};
use crate::resolver::CalTrackClient;
use crate::storage::JsonFileStore;

#[derive(Serialize)]
struct AddOutput<'a> {
    entry: &'a FoodEntry,
    total_calories: u32,
    calorie_goal: u32,
}

pub(crate) async fn cmd_add(store: &JsonFileStore, food: &str, json: bool) -> Result<()> {
    let settings = SettingsStore::new(store.clone()).load().await;
    let recipes = RecipeLibrary::new(store.clone());
    let mut log = FoodLog::load(store.clone()).await;

    let outcome = match log.add_food(food, &recipes).await {
        Ok(outcome) => outcome,
        Err(e @ TrackerError::RecipeNotFound(_)) => {
            if json {
                println!("{}", json_error(&e.to_string()));
            } else {
                eprintln!("{e}");
            }
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let entry_id = match outcome {
        AddOutcome::Ignored => {
            eprintln!("Nothing to add");
            process::exit(2);
        }
        AddOutcome::RecipeAdded(entry) => entry.id,
        AddOutcome::Pending(ticket) => {
            let resolver = CalTrackClient::new(&settings);
            log.resolve_pending(&ticket, &resolver).await;
            ticket.id
        }
    };

    let entry = log
        .get(&entry_id)
        .context("entry vanished after adding")?
        .clone();
    report_entry(&entry, &log, settings.calorie_goal, json);
    Ok(())
}

pub(crate) async fn cmd_retry(store: &JsonFileStore, id: &str, json: bool) -> Result<()> {
    let settings = SettingsStore::new(store.clone()).load().await;
    let mut log = FoodLog::load(store.clone()).await;

    let Some(entry) = log.find_by_id_prefix(id) else {
        anyhow::bail!("No entry matching id '{id}' (run `caltrack today` for ids)");
    };
    let entry_id = entry.id.clone();

    let Some(ticket) = log.retry(&entry_id).await else {
        anyhow::bail!("Entry '{id}' is not retryable; only failed lookups can be retried");
    };

    let resolver = CalTrackClient::new(&settings);
    log.resolve_pending(&ticket, &resolver).await;

    let entry = log
        .get(&ticket.id)
        .context("entry vanished after retry")?
        .clone();
    report_entry(&entry, &log, settings.calorie_goal, json);
    Ok(())
}

pub(crate) async fn cmd_clear(store: &JsonFileStore) -> Result<()> {
    let mut log = FoodLog::load(store.clone()).await;
    log.clear_all().await;
    println!("Cleared today's log");
    Ok(())
}

fn report_entry(entry: &FoodEntry, log: &FoodLog<JsonFileStore>, goal: u32, json: bool) {
    if json {
        let out = AddOutput {
            entry,
            total_calories: log.total_calories(),
            calorie_goal: goal,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_else(|e| json_error(&e.to_string()))
        );
        return;
    }

    match &entry.state {
        EntryState::Resolved { calories, .. } => {
            let name = &entry.name;
            println!("Added {name} — {calories} kcal");
            let total = log.total_calories();
            println!("Today: {total} / {goal} kcal");
        }
        EntryState::Failed { error } => {
            let name = &entry.name;
            let id = short_id(&entry.id);
            eprintln!("Lookup for '{name}' failed: {error}");
            eprintln!("Retry with: caltrack retry {id}");
            process::exit(1);
        }
        EntryState::Loading => {
            // Lookup result was discarded (cleared mid-flight); nothing to report.
            let name = &entry.name;
            eprintln!("'{name}' is still pending");
        }
    }
}
