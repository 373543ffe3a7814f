use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::{Ingredient, MealRecord, UpsertReport};

const MEAL_COLUMNS: &str = "id, name, category, area, instructions, thumbnail_url, tags, video_url, ingredients, raw";

/// SQLite-backed meal cache.
///
/// Holds two relations: `meals`, the last-written copy of every remote record
/// seen, and `favorites`, a set of meal ids. Favorites are not a foreign key;
/// a favorite may point at an id with no cached meal.
///
/// Name ordering uses SQLite's default `BINARY` collation, so it is
/// case-sensitive ("Zucchini" sorts before "apple").
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create the schema if it is missing. Safe to call repeatedly; never
    /// touches existing rows.
    pub fn initialize(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS meals (
                    id TEXT PRIMARY KEY NOT NULL CHECK (id <> ''),
                    name TEXT NOT NULL,
                    category TEXT NOT NULL DEFAULT '',
                    area TEXT NOT NULL DEFAULT '',
                    instructions TEXT NOT NULL DEFAULT '',
                    thumbnail_url TEXT NOT NULL DEFAULT '',
                    tags TEXT NOT NULL DEFAULT '',
                    video_url TEXT NOT NULL DEFAULT '',
                    ingredients TEXT NOT NULL DEFAULT '[]',
                    raw TEXT NOT NULL DEFAULT 'null'
                );

                CREATE TABLE IF NOT EXISTS favorites (
                    meal_id TEXT PRIMARY KEY NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_meals_name ON meals(name);
                CREATE INDEX IF NOT EXISTS idx_meals_category ON meals(category);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    // --- Row mapping ---

    fn json_column<T: serde::de::DeserializeOwned>(
        row: &rusqlite::Row,
        idx: usize,
    ) -> rusqlite::Result<T> {
        let text: String = row.get(idx)?;
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    // Expects MEAL_COLUMNS order.
    fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealRecord> {
        let ingredients: Vec<Ingredient> = Self::json_column(row, 8)?;
        Ok(MealRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            area: row.get(3)?,
            instructions: row.get(4)?,
            thumbnail_url: row.get(5)?,
            tags: row.get(6)?,
            video_url: row.get(7)?,
            ingredients,
            raw_payload: Self::json_column(row, 9)?,
        })
    }

    // --- Meals ---

    /// Insert or fully replace the row keyed by `meal.id`.
    pub fn upsert_meal(&self, meal: &MealRecord) -> Result<()> {
        let ingredients = serde_json::to_string(&meal.ingredients)?;
        let raw = serde_json::to_string(&meal.raw_payload)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO meals (id, name, category, area, instructions, thumbnail_url, tags, video_url, ingredients, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                meal.id,
                meal.name,
                meal.category,
                meal.area,
                meal.instructions,
                meal.thumbnail_url,
                meal.tags,
                meal.video_url,
                ingredients,
                raw,
            ],
        )?;
        Ok(())
    }

    /// Best-effort batch upsert: each record is its own statement, and a
    /// failing record is reported without stopping the rest.
    pub fn upsert_meals(&self, meals: &[MealRecord]) -> UpsertReport {
        let mut report = UpsertReport::default();
        for meal in meals {
            match self.upsert_meal(meal) {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    tracing::warn!(meal_id = %meal.id, error = %e, "failed to cache meal");
                    report.failed.push((meal.id.clone(), e.to_string()));
                }
            }
        }
        report
    }

    pub fn get_all_meals(&self) -> Result<Vec<MealRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MEAL_COLUMNS} FROM meals ORDER BY name, id"))?;
        let meals = stmt
            .query_map([], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    pub fn get_meal_by_id(&self, id: &str) -> Result<Option<MealRecord>> {
        let meal = self
            .conn
            .query_row(
                &format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = ?1"),
                params![id],
                Self::meal_from_row,
            )
            .optional()?;
        Ok(meal)
    }

    pub fn count_meals(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM meals", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct, non-empty categories in ascending order.
    pub fn get_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM meals WHERE category <> '' ORDER BY category",
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    // --- Favorites ---

    /// Cached meals that are favorited, ordered by name. Favorites without a
    /// cached meal are skipped.
    pub fn get_favorites(&self) -> Result<Vec<MealRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.name, m.category, m.area, m.instructions, m.thumbnail_url, m.tags, m.video_url, m.ingredients, m.raw
             FROM meals m
             JOIN favorites f ON f.meal_id = m.id
             ORDER BY m.name, m.id",
        )?;
        let meals = stmt
            .query_map([], Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    pub fn is_favorite(&self, meal_id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM favorites WHERE meal_id = ?1",
                params![meal_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn add_favorite(&self, meal_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO favorites (meal_id) VALUES (?1)",
            params![meal_id],
        )?;
        Ok(())
    }

    /// Returns whether a favorite was actually removed.
    pub fn remove_favorite(&self, meal_id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM favorites WHERE meal_id = ?1", params![meal_id])?;
        Ok(removed > 0)
    }
}
