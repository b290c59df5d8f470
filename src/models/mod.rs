//! Data models
//!
//! Core domain types: macro arithmetic, logged entries, the day log, and
//! the persisted analyzer settings.

mod day_log;
mod food_entry;
mod macros;
mod settings;

pub use day_log::{DayLog, DAILY_CALORIE_GOAL};
pub use food_entry::FoodEntry;
pub use macros::{Macros, FALLBACK_FOOD_NAME, FALLBACK_PER_100G, SCANNED_FOOD_NAME};
pub use settings::AnalyzerSettings;
