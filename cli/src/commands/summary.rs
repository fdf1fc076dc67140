use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::history::{DayTotal, History};
use caltrack_core::log::FoodLog;
use caltrack_core::models::{EntryState, FoodEntry, GoalProgress};
use caltrack_core::settings::SettingsStore;

use super::helpers::{parse_date, short_id, truncate};
use crate::storage::JsonFileStore;

const PROGRESS_WIDTH: usize = 20;

#[derive(Serialize)]
struct TodayOutput<'a> {
    entries: &'a [FoodEntry],
    progress: GoalProgress,
}

pub(crate) async fn cmd_today(store: &JsonFileStore, json: bool) -> Result<()> {
    let settings = SettingsStore::new(store.clone()).load().await;
    let log = FoodLog::load(store.clone()).await;
    let progress = GoalProgress::compute(log.total_calories(), settings.calorie_goal);

    if json {
        let out = TodayOutput {
            entries: log.entries(),
            progress,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if log.entries().is_empty() {
        eprintln!("No entries today");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let rows: Vec<EntryRow> = log
        .entries()
        .iter()
        .map(|e| EntryRow {
            id: short_id(&e.id).to_string(),
            name: truncate(&e.name, 35),
            calories: match &e.state {
                EntryState::Resolved { calories, .. } => format!("{calories} kcal"),
                EntryState::Loading => "pending".to_string(),
                EntryState::Failed { .. } => "failed".to_string(),
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total = progress.total;
    let goal = progress.goal;
    println!("\nTotal: {total} kcal   Goal: {goal} kcal");
    println!("{}", progress_bar(&progress));
    if progress.over {
        let delta = progress.delta;
        println!("{delta} kcal over goal");
    } else {
        let delta = progress.delta;
        println!("{delta} kcal remaining");
    }

    for e in log.entries() {
        if let EntryState::Failed { error } = &e.state {
            let id = short_id(&e.id);
            let name = &e.name;
            eprintln!("'{name}' failed ({error}); retry with: caltrack retry {id}");
        }
    }

    Ok(())
}

fn progress_bar(progress: &GoalProgress) -> String {
    let filled = PROGRESS_WIDTH * progress.percent as usize / 100;
    let mut bar = String::with_capacity(PROGRESS_WIDTH + 2);
    bar.push('[');
    for i in 0..PROGRESS_WIDTH {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');
    let percent = progress.percent;
    format!("{bar} {percent}%")
}

#[derive(Serialize)]
struct DayOutput {
    date: String,
    #[serde(flatten)]
    total: DayTotal,
}

pub(crate) async fn cmd_calendar(
    store: &JsonFileStore,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let history = History::new(store.clone());

    match history.get_by_date(date).await {
        Some(total) => {
            if json {
                let out = DayOutput {
                    date: date.format("%Y-%m-%d").to_string(),
                    total,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let kcal = total.total_calories;
                println!("Total calories for {date}: {kcal} kcal");
            }
        }
        None => {
            if json {
                println!("null");
            } else {
                eprintln!("No data for {date}");
            }
            process::exit(2);
        }
    }
    Ok(())
}

pub(crate) async fn cmd_history(store: &JsonFileStore, days: u32, json: bool) -> Result<()> {
    let history = History::new(store.clone());
    let today = Local::now().date_naive();

    let mut recorded: Vec<(String, Option<DayTotal>)> = Vec::new();
    for i in 0..days {
        let date = today - chrono::Duration::days(i64::from(i));
        let total = history.get_by_date(date).await;
        recorded.push((date.format("%Y-%m-%d").to_string(), total));
    }

    if json {
        let out: Vec<DayOutput> = recorded
            .iter()
            .filter_map(|(date, total)| {
                total.map(|total| DayOutput {
                    date: date.clone(),
                    total,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if recorded.iter().all(|(_, total)| total.is_none()) {
        eprintln!("No data in the last {days} days");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let rows: Vec<HistoryRow> = recorded
        .into_iter()
        .map(|(date, total)| HistoryRow {
            date,
            calories: total.map_or("-".to_string(), |t| {
                let kcal = t.total_calories;
                format!("{kcal}")
            }),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_quarters() {
        let p = GoalProgress::compute(500, 2000);
        assert_eq!(progress_bar(&p), "[#####---------------] 25%");
    }

    #[test]
    fn test_progress_bar_full_when_over() {
        let p = GoalProgress::compute(2500, 2000);
        assert_eq!(progress_bar(&p), "[####################] 100%");
    }

    #[test]
    fn test_progress_bar_empty() {
        let p = GoalProgress::compute(0, 2000);
        assert_eq!(progress_bar(&p), "[--------------------] 0%");
    }
}
