use tabled::settings::Style;
use tabled::{Table, Tabled};

use mealbox_core::models::{MealDetail, MealRecord};

pub(crate) fn print_meal_table(meals: &[&MealRecord], favorites: &[String]) {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "Fav")]
        favorite: &'static str,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .enumerate()
        .map(|(i, m)| MealRow {
            idx: i + 1,
            id: m.id.clone(),
            name: truncate(&m.name, 40),
            category: m.category.clone(),
            area: m.area.clone(),
            favorite: if favorites.contains(&m.id) { "*" } else { "" },
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    let count = meals.len();
    let plural = if count == 1 { "" } else { "s" };
    eprintln!("{count} meal{plural} found");
}

pub(crate) fn print_meal_detail(detail: &MealDetail) {
    let meal = &detail.meal;
    let star = if detail.favorite { " *" } else { "" };
    println!("{}{star}", meal.name);
    println!("ID:       {}", meal.id);
    if !meal.category.is_empty() {
        println!("Category: {}", meal.category);
    }
    if !meal.area.is_empty() {
        println!("Area:     {}", meal.area);
    }
    let tags = meal.tag_list();
    if !tags.is_empty() {
        println!("Tags:     {}", tags.join(", "));
    }
    if !meal.video_url.is_empty() {
        println!("Video:    {}", meal.video_url);
    }

    if !meal.ingredients.is_empty() {
        #[derive(Tabled)]
        struct IngredientRow {
            #[tabled(rename = "Ingredient")]
            name: String,
            #[tabled(rename = "Measure")]
            measure: String,
        }

        let rows: Vec<IngredientRow> = meal
            .ingredients
            .iter()
            .map(|i| IngredientRow {
                name: i.ingredient_name.clone(),
                measure: i.measure.clone(),
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!();
        println!("{table}");
    }

    if !meal.instructions.trim().is_empty() {
        println!();
        println!("{}", meal.instructions.trim());
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
