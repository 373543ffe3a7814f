use anyhow::{Context, Result};
use std::process;

use mealbox_core::engine::SyncEngine;

use super::helpers::print_meal_detail;
use super::print_meals;

pub(crate) async fn cmd_show(engine: &SyncEngine, id: &str, json: bool) -> Result<()> {
    let Some(detail) = engine
        .meal_detail(id)
        .await
        .with_context(|| format!("Failed to look up meal '{id}'"))?
    else {
        if json {
            println!("null");
        } else {
            eprintln!("No meal found with id '{id}'");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_meal_detail(&detail);
    }

    Ok(())
}

/// Search TheMealDB by name; matches are cached for later browsing.
pub(crate) async fn cmd_search(engine: &SyncEngine, query: &str, json: bool) -> Result<()> {
    let (found, upsert) = engine
        .search_remote(query)
        .await
        .with_context(|| format!("Failed to search for '{query}'"))?;
    if !upsert.is_complete() {
        let failed = upsert.failed.len();
        eprintln!("Note: {failed} meals could not be cached");
    }

    print_meals(engine, &found, None, None, json).await
}
