use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use mealbox_core::source::DEFAULT_PARTITIONS;

use crate::mealdb::DEFAULT_BASE_URL;

pub struct Config {
    pub db_path: PathBuf,
    pub base_url: String,
    pub partitions: Vec<char>,
    pub timeout: Duration,
}

impl Config {
    /// Resolve paths from the platform data directory, then apply
    /// `MEALBOX_*` environment overrides.
    pub fn load() -> Result<Self> {
        let db_path = match std::env::var_os("MEALBOX_DB") {
            Some(path) => PathBuf::from(path),
            None => {
                let proj_dirs = ProjectDirs::from("", "", "mealbox")
                    .context("Could not determine home directory")?;
                let data_dir = proj_dirs.data_dir().to_path_buf();
                std::fs::create_dir_all(&data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("mealbox.db")
            }
        };

        let base_url =
            std::env::var("MEALBOX_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let partitions = match std::env::var("MEALBOX_PARTITIONS") {
            Ok(letters) => parse_partitions(&letters)?,
            Err(_) => DEFAULT_PARTITIONS.to_vec(),
        };

        let timeout = match std::env::var("MEALBOX_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("Invalid MEALBOX_TIMEOUT_SECS: '{secs}'"))?,
            ),
            Err(_) => Duration::from_secs(10),
        };

        Ok(Config {
            db_path,
            base_url,
            partitions,
            timeout,
        })
    }
}

/// Parse a bucket list such as `"abc"` or `"a,b,c"` into distinct lowercase
/// letters, keeping first-seen order.
pub(crate) fn parse_partitions(s: &str) -> Result<Vec<char>> {
    let mut partitions = Vec::new();
    for c in s.chars().filter(|c| !c.is_whitespace() && *c != ',') {
        if !c.is_ascii_alphanumeric() {
            bail!("Invalid partition '{c}' in '{s}'. Use letters or digits, e.g. 'abc'");
        }
        let c = c.to_ascii_lowercase();
        if !partitions.contains(&c) {
            partitions.push(c);
        }
    }
    if partitions.is_empty() {
        bail!("At least one partition letter is required");
    }
    Ok(partitions)
}
