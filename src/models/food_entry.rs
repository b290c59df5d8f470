//! Logged meal entry
//!
//! A committed line in the day log. Entries are immutable once created;
//! corrections are remove-and-relog.

use serde::{Deserialize, Serialize};

use super::Macros;

/// A meal committed to the day log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: i64,
    pub name: String,
    pub grams: f64,
    /// Macros scaled to the portion, not per-100g
    pub macros: Macros,
}

impl FoodEntry {
    pub fn new(id: i64, name: impl Into<String>, grams: f64, macros: Macros) -> Self {
        Self {
            id,
            name: name.into(),
            grams,
            macros,
        }
    }
}
