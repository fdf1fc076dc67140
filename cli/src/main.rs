mod commands;
mod config;
mod resolver;
mod storage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_add, cmd_calendar, cmd_clear, cmd_history, cmd_recipe_find, cmd_recipe_list,
    cmd_recipe_save, cmd_recipe_show, cmd_retry, cmd_settings_reset, cmd_settings_set,
    cmd_settings_show, cmd_today,
};
use crate::config::Config;
use crate::storage::JsonFileStore;

#[derive(Parser)]
#[command(
    name = "caltrack",
    version,
    about = "A conversational calorie tracker CLI",
    long_about = "\nTrack what you eat in plain words. Type a food (or a whole meal),\nlet the lookup service estimate the calories, and watch your daily\ntotal against your goal.\n"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a food to today's log (use @name to add a saved recipe)
    Add {
        /// Food description, e.g. "2 eggs and toast" or "@omelet"
        food: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's log with progress against your goal
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Retry a failed calorie lookup
    Retry {
        /// Entry ID (or unique prefix) from `caltrack today`
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear today's log
    Clear,
    /// Show the recorded total for a past date
    Calendar {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recorded totals for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage saved recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage goal and API key settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List all saved recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a resolved log entry as a recipe
    Save {
        /// Entry ID (or unique prefix) from `caltrack today`
        entry_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe's calories, breakdown, and sources
    Show {
        /// Recipe name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find recipes whose names contain a query
    Find {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update one or more settings
    Set {
        /// Daily calorie goal (500-10000)
        #[arg(long)]
        goal: Option<String>,
        /// Gemini API key for custom-key lookups
        #[arg(long)]
        gemini_key: Option<String>,
        /// Scira API key for custom-key lookups
        #[arg(long)]
        scira_key: Option<String>,
        /// Use your own API keys for lookups (requires both keys)
        #[arg(long)]
        use_custom_keys: Option<bool>,
    },
    /// Reset settings to defaults and remove stored API keys
    Reset,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = JsonFileStore::new(config.store_path);

    match cli.command {
        Commands::Add { food, json } => cmd_add(&store, &food, json).await,
        Commands::Today { json } => cmd_today(&store, json).await,
        Commands::Retry { id, json } => cmd_retry(&store, &id, json).await,
        Commands::Clear => cmd_clear(&store).await,
        Commands::Calendar { date, json } => cmd_calendar(&store, date, json).await,
        Commands::History { days, json } => cmd_history(&store, days, json).await,
        Commands::Recipe { command } => match command {
            RecipeCommands::List { json } => cmd_recipe_list(&store, json).await,
            RecipeCommands::Save { entry_id, json } => {
                cmd_recipe_save(&store, &entry_id, json).await
            }
            RecipeCommands::Show { name, json } => cmd_recipe_show(&store, &name, json).await,
            RecipeCommands::Find { query, json } => cmd_recipe_find(&store, &query, json).await,
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&store, json).await,
            SettingsCommands::Set {
                goal,
                gemini_key,
                scira_key,
                use_custom_keys,
            } => cmd_settings_set(&store, goal, gemini_key, scira_key, use_custom_keys).await,
            SettingsCommands::Reset => cmd_settings_reset(&store).await,
        },
    }
}
