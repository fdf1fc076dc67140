use anyhow::Result;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::log::FoodLog;
use caltrack_core::models::{EntryState, FoodEntry};
use caltrack_core::recipes::RecipeLibrary;

use super::helpers::truncate;
use crate::storage::JsonFileStore;

pub(crate) async fn cmd_recipe_list(store: &JsonFileStore, json: bool) -> Result<()> {
    let library = RecipeLibrary::new(store.clone());
    let recipes = library.all().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    if recipes.is_empty() {
        eprintln!("No saved recipes");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let mut names: Vec<&String> = recipes.keys().collect();
    names.sort();
    let rows: Vec<RecipeRow> = names
        .into_iter()
        .map(|name| {
            let kcal = recipes[name].calories();
            RecipeRow {
                name: truncate(name, 35),
                calories: format!("{kcal} kcal"),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) async fn cmd_recipe_save(store: &JsonFileStore, entry_id: &str, json: bool) -> Result<()> {
    let log = FoodLog::load(store.clone()).await;

    let Some(entry) = log.find_by_id_prefix(entry_id) else {
        anyhow::bail!("No entry matching id '{entry_id}' (run `caltrack today` for ids)");
    };
    if !entry.is_resolved() {
        anyhow::bail!("Only resolved entries can be saved as recipes");
    }

    let library = RecipeLibrary::new(store.clone());
    let key = library.save(entry).await?;

    if json {
        #[derive(Serialize)]
        struct SaveOutput<'a> {
            key: &'a str,
        }
        println!("{}", serde_json::to_string_pretty(&SaveOutput { key: &key })?);
    } else {
        let name = &entry.name;
        println!("Recipe '{name}' saved for quick reuse (add it with '@{key}')");
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_show(store: &JsonFileStore, name: &str, json: bool) -> Result<()> {
    let library = RecipeLibrary::new(store.clone());

    let Some(entry) = library.get(name).await else {
        if json {
            println!("null");
        } else {
            eprintln!("No saved recipe for '{name}'");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    print_recipe(&entry);
    Ok(())
}

pub(crate) async fn cmd_recipe_find(store: &JsonFileStore, query: &str, json: bool) -> Result<()> {
    let library = RecipeLibrary::new(store.clone());
    let matches = library.find_matching(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        eprintln!("No recipes matching '{query}'");
        process::exit(2);
    }
    for name in matches {
        println!("{name}");
    }
    Ok(())
}

fn print_recipe(entry: &FoodEntry) {
    let name = &entry.name;
    println!("=== {name} ===");
    let EntryState::Resolved {
        calories,
        ingredients,
        sources,
    } = &entry.state
    else {
        println!("  (unresolved)");
        return;
    };

    println!("  Total: {calories} kcal");
    if !ingredients.is_empty() {
        println!("\n  Breakdown:");
        for ing in ingredients {
            let ing_name = &ing.name;
            let ing_cal = ing.calories;
            println!("    {ing_name} — {ing_cal} kcal");
        }
    }
    if !sources.is_empty() {
        println!("\n  Sources:");
        for source in sources {
            println!("    {source}");
        }
    }
}
