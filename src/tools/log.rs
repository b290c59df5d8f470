//! Day log MCP tools
//!
//! Read and prune today's committed entries. Entries only enter the log
//! through the capture workflow, so everything here is already validated.

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::models::{DayLog, FoodEntry, Macros, DAILY_CALORIE_GOAL};

/// Response for get_daily_totals
#[derive(Debug, Serialize)]
pub struct DailyTotalsResponse {
    pub date: String,
    pub totals: Macros,
    pub daily_goal: f64,
    pub calories_remaining: f64,
    pub goal_reached: bool,
    pub entry_count: usize,
}

/// Response for list_entries
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    pub date: String,
    /// Most recent first
    pub entries: Vec<FoodEntry>,
    pub totals: Macros,
}

/// Response for remove_entry
#[derive(Debug, Serialize)]
pub struct RemoveEntryResponse {
    pub removed: Option<FoodEntry>,
    pub totals: Macros,
    pub entry_count: usize,
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Running totals against the daily goal
pub fn get_daily_totals(day_log: &std::sync::Mutex<DayLog>) -> DailyTotalsResponse {
    let log = day_log.lock().unwrap();
    DailyTotalsResponse {
        date: today(),
        totals: log.totals(),
        daily_goal: DAILY_CALORIE_GOAL,
        calories_remaining: log.calories_remaining(),
        goal_reached: log.goal_reached(),
        entry_count: log.len(),
    }
}

/// Every entry logged today, newest first
pub fn list_entries(day_log: &std::sync::Mutex<DayLog>) -> ListEntriesResponse {
    let log = day_log.lock().unwrap();
    ListEntriesResponse {
        date: today(),
        entries: log.entries().to_vec(),
        totals: log.totals(),
    }
}

/// Remove a logged entry by id. Unknown ids leave the log untouched and
/// come back with `removed: null` rather than an error.
pub fn remove_entry(day_log: &std::sync::Mutex<DayLog>, id: i64) -> RemoveEntryResponse {
    let mut log = day_log.lock().unwrap();
    let removed = log.remove(id);

    if let Some(entry) = &removed {
        info!(id = entry.id, name = %entry.name, "entry removed from day log");
    }

    RemoveEntryResponse {
        removed,
        totals: log.totals(),
        entry_count: log.len(),
    }
}
