use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result, SourceError};
use crate::mealdb::{RawMeal, payload_to_meal};
use crate::models::MealRecord;

/// First-letter buckets fetched on a full refresh.
pub const DEFAULT_PARTITIONS: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

/// Remote recipe source.
///
/// The CLI implements this with reqwest; tests use in-memory fakes. No
/// caching or retries happen behind this trait.
#[async_trait]
pub trait MealSource: Send + Sync {
    /// All meals whose name starts with `letter`.
    async fn fetch_partition(&self, letter: char) -> Result<Vec<RawMeal>, SourceError>;
    async fn lookup(&self, id: &str) -> Result<Option<RawMeal>, SourceError>;
    async fn search(&self, name: &str) -> Result<Vec<RawMeal>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionFailure {
    pub partition: char,
    pub reason: String,
}

/// Result of a partitioned fetch: everything that arrived, plus the buckets
/// that did not.
#[derive(Debug, Default)]
pub struct PartitionedFetch {
    pub meals: Vec<MealRecord>,
    pub failures: Vec<PartitionFailure>,
    /// Payloads dropped because they had no usable id.
    pub malformed: usize,
}

pub(crate) fn decode_payloads(payloads: Vec<RawMeal>) -> (Vec<MealRecord>, usize) {
    let total = payloads.len();
    let meals: Vec<MealRecord> = payloads.into_iter().filter_map(payload_to_meal).collect();
    let malformed = total - meals.len();
    if malformed > 0 {
        tracing::warn!(malformed, "dropped meal payloads without an id");
    }
    (meals, malformed)
}

/// Fetch every partition independently and concatenate the results in
/// partition order. A failed partition is recorded and skipped; only when
/// every partition fails is the whole fetch an error.
pub async fn fetch_all(source: &dyn MealSource, partitions: &[char]) -> Result<PartitionedFetch> {
    let mut fetched = PartitionedFetch::default();

    for &partition in partitions {
        match source.fetch_partition(partition).await {
            Ok(payloads) => {
                let (meals, malformed) = decode_payloads(payloads);
                tracing::debug!(%partition, count = meals.len(), "fetched partition");
                fetched.meals.extend(meals);
                fetched.malformed += malformed;
            }
            Err(e) => {
                tracing::warn!(%partition, error = %e, "partition fetch failed");
                fetched.failures.push(PartitionFailure {
                    partition,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !partitions.is_empty() && fetched.failures.len() == partitions.len() {
        let reasons: Vec<String> = fetched
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.partition, f.reason))
            .collect();
        return Err(Error::Network(
            format!("all partitions failed ({})", reasons.join("; ")).into(),
        ));
    }

    Ok(fetched)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory source keyed by partition letter. Letters listed in
    /// `failing` return an error.
    #[derive(Default)]
    pub struct FakeSource {
        pub partitions: HashMap<char, Vec<RawMeal>>,
        pub failing: Vec<char>,
        pub calls: Mutex<Vec<char>>,
    }

    impl FakeSource {
        pub fn with(mut self, letter: char, meals: Vec<serde_json::Value>) -> Self {
            let raw = meals
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            self.partitions.insert(letter, raw);
            self
        }

        pub fn failing(mut self, letters: &[char]) -> Self {
            self.failing.extend_from_slice(letters);
            self
        }

        fn all(&self) -> impl Iterator<Item = &RawMeal> {
            self.partitions.values().flatten()
        }
    }

    #[async_trait]
    impl MealSource for FakeSource {
        async fn fetch_partition(&self, letter: char) -> Result<Vec<RawMeal>, SourceError> {
            self.calls.lock().unwrap().push(letter);
            if self.failing.contains(&letter) {
                return Err(format!("connection reset fetching '{letter}'").into());
            }
            Ok(self.partitions.get(&letter).cloned().unwrap_or_default())
        }

        async fn lookup(&self, id: &str) -> Result<Option<RawMeal>, SourceError> {
            Ok(self
                .all()
                .find(|m| m.get("idMeal").and_then(|v| v.as_str()) == Some(id))
                .cloned())
        }

        async fn search(&self, name: &str) -> Result<Vec<RawMeal>, SourceError> {
            let needle = name.to_lowercase();
            Ok(self
                .all()
                .filter(|m| {
                    m.get("strMeal")
                        .and_then(|v| v.as_str())
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect())
        }
    }

    pub fn payload(id: &str, name: &str, category: &str) -> serde_json::Value {
        serde_json::json!({
            "idMeal": id,
            "strMeal": name,
            "strCategory": category,
            "strIngredient1": "Water",
            "strMeasure1": "1 cup",
        })
    }
}
