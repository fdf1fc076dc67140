use anyhow::Result;
use caltrack_core::models::{Settings, parse_goal};
use caltrack_core::settings::SettingsStore;

use crate::storage::JsonFileStore;

pub(crate) async fn cmd_settings_show(store: &JsonFileStore, json: bool) -> Result<()> {
    let settings = SettingsStore::new(store.clone()).load().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let goal = settings.calorie_goal;
    println!("Daily calorie goal: {goal} kcal");
    let custom = if settings.use_custom_keys { "yes" } else { "no" };
    println!("Use custom API keys: {custom}");
    println!("Gemini API key: {}", mask(&settings.gemini_key));
    println!("Scira API key: {}", mask(&settings.scira_key));
    Ok(())
}

pub(crate) async fn cmd_settings_set(
    store: &JsonFileStore,
    goal: Option<String>,
    gemini_key: Option<String>,
    scira_key: Option<String>,
    use_custom_keys: Option<bool>,
) -> Result<()> {
    let settings_store = SettingsStore::new(store.clone());
    let mut settings = settings_store.load().await;

    if let Some(raw) = goal {
        settings.calorie_goal = parse_goal(&raw)?;
    }
    if let Some(key) = gemini_key {
        settings.gemini_key = key;
    }
    if let Some(key) = scira_key {
        settings.scira_key = key;
    }
    if let Some(enabled) = use_custom_keys {
        settings.use_custom_keys = enabled;
    }

    settings_store.save(&settings).await?;

    let goal = settings.calorie_goal;
    println!("Settings saved (goal: {goal} kcal)");
    Ok(())
}

pub(crate) async fn cmd_settings_reset(store: &JsonFileStore) -> Result<()> {
    SettingsStore::new(store.clone()).reset_to_defaults().await?;
    let goal = Settings::default().calorie_goal;
    println!("Settings reset to defaults (goal: {goal} kcal, custom keys removed)");
    Ok(())
}

fn mask(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }
    if key.chars().count() <= 4 {
        return "****".to_string();
    }
    let cut = key.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
    format!("****{}", &key[cut..])
}
