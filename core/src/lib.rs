pub mod db;
pub mod engine;
pub mod error;
pub mod filter;
pub mod mealdb;
pub mod models;
pub mod source;

pub use error::{Error, Result};
