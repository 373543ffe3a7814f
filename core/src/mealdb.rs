use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::{Ingredient, MealRecord};

/// Number of numbered `strIngredientN` / `strMeasureN` pairs in a payload.
pub const MAX_INGREDIENTS: usize = 20;

/// One flat meal object as returned by TheMealDB.
pub type RawMeal = Map<String, Value>;

/// Envelope for `search.php` and `lookup.php`. `meals` is `null` when
/// nothing matched.
#[derive(Debug, Deserialize)]
pub struct MealsResponse {
    pub meals: Option<Vec<RawMeal>>,
}

impl MealsResponse {
    #[must_use]
    pub fn into_meals(self) -> Vec<RawMeal> {
        self.meals.unwrap_or_default()
    }
}

fn text(raw: &RawMeal, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[must_use]
pub fn extract_ingredients(raw: &RawMeal) -> Vec<Ingredient> {
    (1..=MAX_INGREDIENTS)
        .filter_map(|i| {
            let name = text(raw, &format!("strIngredient{i}"));
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Ingredient {
                ingredient_name: name.to_string(),
                measure: text(raw, &format!("strMeasure{i}")).trim().to_string(),
            })
        })
        .collect()
}

/// Convert an upstream payload into a cacheable record. Returns `None` when
/// the payload has no usable `idMeal`.
#[must_use]
pub fn payload_to_meal(raw: RawMeal) -> Option<MealRecord> {
    let id = text(&raw, "idMeal").trim().to_string();
    if id.is_empty() {
        return None;
    }

    Some(MealRecord {
        id,
        name: text(&raw, "strMeal"),
        category: text(&raw, "strCategory"),
        area: text(&raw, "strArea"),
        instructions: text(&raw, "strInstructions"),
        thumbnail_url: text(&raw, "strMealThumb"),
        tags: text(&raw, "strTags"),
        video_url: text(&raw, "strYoutube"),
        ingredients: extract_ingredients(&raw),
        raw_payload: Value::Object(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawMeal {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn full_payload() -> RawMeal {
        raw(json!({
            "idMeal": "52977",
            "strMeal": "Corba",
            "strCategory": "Side",
            "strArea": "Turkish",
            "strInstructions": "Pick through your lentils...",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/58oia61564916529.jpg",
            "strTags": "Soup",
            "strYoutube": "https://www.youtube.com/watch?v=VVnZd8A84z4",
            "strIngredient1": "Lentils",
            "strMeasure1": "1 cup ",
            "strIngredient2": "Onion",
            "strMeasure2": "1 large",
            "strIngredient3": "",
            "strMeasure3": "",
            "strIngredient4": null,
            "strMeasure4": null,
            "strSource": "https://findingtimeforcooking.com/main-dishes/red-lentil-soup-corba/"
        }))
    }

    #[test]
    fn test_payload_to_meal_complete() {
        let meal = payload_to_meal(full_payload()).unwrap();
        assert_eq!(meal.id, "52977");
        assert_eq!(meal.name, "Corba");
        assert_eq!(meal.category, "Side");
        assert_eq!(meal.area, "Turkish");
        assert_eq!(meal.tags, "Soup");
        assert_eq!(meal.video_url, "https://www.youtube.com/watch?v=VVnZd8A84z4");
        assert_eq!(meal.ingredients.len(), 2);
        assert_eq!(meal.ingredients[0].ingredient_name, "Lentils");
        assert_eq!(meal.ingredients[0].measure, "1 cup");
        // Unmapped fields survive in the raw payload
        assert_eq!(
            meal.raw_payload["strSource"],
            "https://findingtimeforcooking.com/main-dishes/red-lentil-soup-corba/"
        );
    }

    #[test]
    fn test_extract_ingredients_skips_blank_names() {
        let payload = raw(json!({
            "idMeal": "1",
            "strIngredient3": "Salt",
            "strMeasure3": "1 tsp",
            "strIngredient4": "",
            "strMeasure4": "2 cups",
            "strIngredient5": "   ",
            "strMeasure5": "3 tbsp",
        }));
        let ingredients = extract_ingredients(&payload);
        assert_eq!(
            ingredients,
            vec![Ingredient {
                ingredient_name: "Salt".to_string(),
                measure: "1 tsp".to_string(),
            }]
        );
    }

    #[test]
    fn test_extract_ingredients_preserves_field_order() {
        let payload = raw(json!({
            "strIngredient20": "Parsley",
            "strIngredient2": "Garlic",
            "strIngredient1": "Butter",
            "strMeasure1": "50g",
        }));
        let names: Vec<_> = extract_ingredients(&payload)
            .into_iter()
            .map(|i| i.ingredient_name)
            .collect();
        assert_eq!(names, vec!["Butter", "Garlic", "Parsley"]);
    }

    #[test]
    fn test_missing_measure_becomes_empty() {
        let payload = raw(json!({ "strIngredient1": "Eggs", "strMeasure1": null }));
        let ingredients = extract_ingredients(&payload);
        assert_eq!(ingredients[0].measure, "");
    }

    #[test]
    fn test_payload_to_meal_minimal() {
        let meal = payload_to_meal(raw(json!({ "idMeal": "7", "strMeal": "Toast" }))).unwrap();
        assert_eq!(meal.id, "7");
        assert_eq!(meal.name, "Toast");
        assert_eq!(meal.category, "");
        assert_eq!(meal.area, "");
        assert_eq!(meal.tags, "");
        assert!(meal.ingredients.is_empty());
    }

    #[test]
    fn test_payload_to_meal_missing_id() {
        assert!(payload_to_meal(raw(json!({ "strMeal": "Nameless" }))).is_none());
        assert!(payload_to_meal(raw(json!({ "idMeal": " ", "strMeal": "Blank" }))).is_none());
        assert!(payload_to_meal(raw(json!({ "idMeal": null }))).is_none());
    }

    #[test]
    fn test_numeric_id_accepted() {
        let meal = payload_to_meal(raw(json!({ "idMeal": 52772 }))).unwrap();
        assert_eq!(meal.id, "52772");
    }

    #[test]
    fn test_meals_response_null() {
        let resp: MealsResponse = serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(resp.into_meals().is_empty());
    }
}
