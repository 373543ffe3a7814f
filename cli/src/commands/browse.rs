use anyhow::{Context, Result, bail};
use std::process;
use std::sync::Arc;

use mealbox_core::Error;
use mealbox_core::engine::{LoadEvent, SyncEngine};
use mealbox_core::models::Snapshot;

use super::print_meals;

pub(crate) async fn cmd_load(
    engine: &Arc<SyncEngine>,
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut stream = engine.load();
    let mut shown = Snapshot::default();

    while let Some(event) = stream.next().await {
        match event {
            LoadEvent::CacheServed(snapshot) => {
                if !json {
                    let count = snapshot.meals.len();
                    eprintln!("Loaded {count} cached meals, refreshing...");
                }
                shown = snapshot;
            }
            LoadEvent::Reconciled {
                snapshot,
                failed_partitions,
                upsert,
            } => {
                if !failed_partitions.is_empty() {
                    let letters: Vec<String> = failed_partitions
                        .iter()
                        .map(|f| f.partition.to_string())
                        .collect();
                    let letters = letters.join(", ");
                    eprintln!("Note: could not refresh meals starting with {letters}");
                }
                if !upsert.is_complete() {
                    let failed = upsert.failed.len();
                    eprintln!("Note: {failed} meals could not be cached");
                }
                shown = snapshot;
            }
            LoadEvent::StaleFallback { reason } => {
                tracing::info!(%reason, "refresh failed, showing cached meals");
            }
            LoadEvent::Failed(Error::Unavailable(reason)) => {
                bail!(
                    "Could not load meals ({reason}). Check your connection and run `mealbox load` to retry"
                );
            }
            LoadEvent::Failed(e) => return Err(e).context("Failed to load meals"),
        }
    }

    print_meals(engine, &shown.meals, search, category, json).await
}

pub(crate) async fn cmd_list(
    engine: &SyncEngine,
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let snapshot = engine.cached().await.context("Failed to read meal cache")?;
    if snapshot.is_empty() && !json {
        eprintln!("The meal cache is empty. Run `mealbox load` to fetch meals.");
        process::exit(2);
    }
    print_meals(engine, &snapshot.meals, search, category, json).await
}

pub(crate) async fn cmd_categories(engine: &SyncEngine, json: bool) -> Result<()> {
    let categories = engine.categories().await?;

    if categories.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No categories cached. Run `mealbox load` first.");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in &categories {
            println!("{category}");
        }
    }

    Ok(())
}
