use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub ingredient_name: String,
    pub measure: String,
}

/// A cached recipe. Optional upstream fields are stored as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub area: String,
    pub instructions: String,
    pub thumbnail_url: String,
    pub tags: String,
    pub video_url: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub raw_payload: serde_json::Value,
}

impl MealRecord {
    /// Comma-separated `tags` split into trimmed, non-empty entries.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A single meal as shown on a detail view.
#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    #[serde(flatten)]
    pub meal: MealRecord,
    pub favorite: bool,
}

/// Outcome of a best-effort batch upsert.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UpsertReport {
    pub stored: usize,
    /// `(meal id, error message)` for each record that failed to write.
    pub failed: Vec<(String, String)>,
}

impl UpsertReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Meals plus the categories derived from them, as exposed to the caller.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Snapshot {
    pub meals: Vec<MealRecord>,
    pub categories: Vec<String>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}
