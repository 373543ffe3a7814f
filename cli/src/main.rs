mod commands;
mod config;
mod mealdb;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    FavoriteAction, cmd_categories, cmd_favorite, cmd_favorites, cmd_list, cmd_load, cmd_search,
    cmd_show,
};
use crate::config::Config;
use crate::mealdb::MealDbClient;
use mealbox_core::db::Database;
use mealbox_core::engine::SyncEngine;

#[derive(Parser)]
#[command(
    name = "mealbox",
    version,
    about = "Browse TheMealDB recipes from a local, offline-friendly cache"
)]
struct Cli {
    /// Log sync progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cached meals, then refresh them from TheMealDB
    Load {
        /// Only show meals whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only show meals in this category (exact match)
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached meals without touching the network
    List {
        /// Only show meals whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only show meals in this category (exact match)
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal's ingredients and instructions
    Show {
        /// Meal ID (e.g. 52772)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search TheMealDB by meal name and cache the results
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the categories present in the cache
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List favorite meals
    Favorites {
        /// Only show favorites whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Only show favorites in this category (exact match)
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark or unmark a meal as a favorite
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Add a meal to favorites
    Add {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a meal from favorites
    Remove {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a meal's favorite flag
    Toggle {
        /// Meal ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mealbox=info,mealbox_core=info"
    } else {
        "mealbox=warn,mealbox_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open meal cache: {}", config.db_path.display()))?;
    let client = MealDbClient::new(&config.base_url, config.timeout)?;
    let engine =
        Arc::new(SyncEngine::new(db, Arc::new(client)).with_partitions(config.partitions));

    match cli.command {
        Commands::Load {
            search,
            category,
            json,
        } => cmd_load(&engine, search.as_deref(), category.as_deref(), json).await?,
        Commands::List {
            search,
            category,
            json,
        } => cmd_list(&engine, search.as_deref(), category.as_deref(), json).await?,
        Commands::Show { id, json } => cmd_show(&engine, &id, json).await?,
        Commands::Search { query, json } => cmd_search(&engine, &query, json).await?,
        Commands::Categories { json } => cmd_categories(&engine, json).await?,
        Commands::Favorites {
            search,
            category,
            json,
        } => cmd_favorites(&engine, search.as_deref(), category.as_deref(), json).await?,
        Commands::Favorite { command } => {
            let (action, id, json) = match command {
                FavoriteCommands::Add { id, json } => (FavoriteAction::Add, id, json),
                FavoriteCommands::Remove { id, json } => (FavoriteAction::Remove, id, json),
                FavoriteCommands::Toggle { id, json } => (FavoriteAction::Toggle, id, json),
            };
            cmd_favorite(&engine, action, &id, json).await?;
        }
    }

    // A finished load task may still hold its handle; the store then closes on drop.
    if let Ok(engine) = Arc::try_unwrap(engine) {
        engine.close().context("Failed to close meal cache")?;
    }
    Ok(())
}
