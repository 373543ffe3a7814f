use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::process;

use mealbox_core::engine::SyncEngine;

use super::print_meals;

#[derive(Debug, Clone, Copy)]
pub(crate) enum FavoriteAction {
    Add,
    Remove,
    Toggle,
}

#[derive(Serialize)]
struct FavoriteStatus<'a> {
    id: &'a str,
    favorite: bool,
}

pub(crate) async fn cmd_favorites(
    engine: &SyncEngine,
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let favorites = engine
        .favorites()
        .await
        .context("Failed to read favorites")?;

    if favorites.is_empty() && !json {
        eprintln!("You have no favorites yet. Add one with `mealbox favorite add <id>`.");
        process::exit(2);
    }

    print_meals(engine, &favorites, search, category, json).await
}

/// Apply `action` to meal `id`, returning the meal's display name and the
/// favorite flag as stored.
///
/// Adding and toggling resolve the meal first (cache, then remote lookup), so
/// they never leave a favorite pointing at an unknown id. Removing only
/// consults the cache for the name and falls back to the id.
async fn apply_favorite(
    engine: &SyncEngine,
    action: FavoriteAction,
    id: &str,
) -> Result<(String, bool)> {
    let name = match action {
        FavoriteAction::Add | FavoriteAction::Toggle => match engine.meal_detail(id).await? {
            Some(detail) => detail.meal.name,
            None => bail!("No meal found with id '{id}'"),
        },
        FavoriteAction::Remove => engine
            .cached_detail(id)
            .await?
            .map_or_else(|| id.to_string(), |detail| detail.meal.name),
    };

    let favorite = match action {
        FavoriteAction::Add => engine.set_favorite(id, true).await,
        FavoriteAction::Remove => engine.set_favorite(id, false).await,
        FavoriteAction::Toggle => engine.toggle_favorite(id).await,
    }
    .context("Could not update favorites. Please try again")?;

    Ok((name, favorite))
}

pub(crate) async fn cmd_favorite(
    engine: &SyncEngine,
    action: FavoriteAction,
    id: &str,
    json: bool,
) -> Result<()> {
    let (name, favorite) = apply_favorite(engine, action, id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&FavoriteStatus { id, favorite })?
        );
    } else if favorite {
        println!("Added {name} to favorites");
    } else {
        println!("Removed {name} from favorites");
    }

    Ok(())
}
