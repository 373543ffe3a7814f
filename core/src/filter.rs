use crate::models::MealRecord;

/// Narrow `records` to those in `category` (exact match) whose name contains
/// `search` (trimmed, case-insensitive). Blank search text disables the name
/// predicate; `None` or an empty category disables the category predicate.
/// Surviving records keep their input order.
#[must_use]
pub fn filter_meals<'a>(
    records: &'a [MealRecord],
    search: &str,
    category: Option<&str>,
) -> Vec<&'a MealRecord> {
    let needle = search.trim().to_lowercase();
    records
        .iter()
        .filter(|m| {
            category
                .filter(|c| !c.is_empty())
                .is_none_or(|c| m.category == c)
        })
        .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
        .collect()
}
