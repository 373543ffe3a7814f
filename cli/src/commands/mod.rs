mod browse;
mod detail;
mod favorite;
mod helpers;

use anyhow::Result;
use std::process;

use mealbox_core::engine::SyncEngine;
use mealbox_core::filter::filter_meals;
use mealbox_core::models::MealRecord;

use helpers::print_meal_table;

pub(crate) use browse::{cmd_categories, cmd_list, cmd_load};
pub(crate) use detail::{cmd_search, cmd_show};
pub(crate) use favorite::{FavoriteAction, cmd_favorite, cmd_favorites};

/// Apply the search/category filter and print what survives. Exits with
/// status 2 when nothing matches.
pub(super) async fn print_meals(
    engine: &SyncEngine,
    meals: &[MealRecord],
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let filtered = filter_meals(meals, search.unwrap_or_default(), category);

    if filtered.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No meals found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&filtered)?);
    } else {
        let favorites: Vec<String> = engine
            .favorites()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        print_meal_table(&filtered, &favorites);
    }

    Ok(())
}
