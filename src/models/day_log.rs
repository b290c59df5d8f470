//! Day log
//!
//! In-memory record of everything logged today: an ordered list of entries
//! (most recent first) plus a running macro total maintained incrementally,
//! so reading totals never re-sums the list.

use super::{FoodEntry, Macros};

/// Fixed daily calorie target used for the progress readout.
pub const DAILY_CALORIE_GOAL: f64 = 2000.0;

/// Today's committed entries and their running totals
#[derive(Debug)]
pub struct DayLog {
    entries: Vec<FoodEntry>,
    totals: Macros,
    next_id: i64,
}

impl DayLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            totals: Macros::zero(),
            next_id: 1,
        }
    }

    /// Reserve the next entry id.
    pub fn mint_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Commit an entry: newest first, totals updated in place.
    pub fn append(&mut self, entry: FoodEntry) {
        self.totals = self.totals.add(&entry.macros);
        self.entries.insert(0, entry);
    }

    /// Remove an entry by id and return it. Unknown ids leave the log
    /// untouched. Each total component clamps at zero on the way down.
    pub fn remove(&mut self, id: i64) -> Option<FoodEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        self.totals = self.totals.saturating_sub(&entry.macros);
        Some(entry)
    }

    pub fn totals(&self) -> Macros {
        self.totals
    }

    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calories left before the daily goal, clamped at zero.
    pub fn calories_remaining(&self) -> f64 {
        (DAILY_CALORIE_GOAL - self.totals.calories).max(0.0)
    }

    pub fn goal_reached(&self) -> bool {
        self.totals.calories >= DAILY_CALORIE_GOAL
    }
}

impl Default for DayLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(log: &mut DayLog, calories: f64) -> FoodEntry {
        let id = log.mint_id();
        FoodEntry::new(
            id,
            "Test Food",
            100.0,
            Macros {
                calories,
                protein: 10.0,
                carbs: 20.0,
                fat: 5.0,
            },
        )
    }

    #[test]
    fn test_append_prepends_and_accumulates() {
        let mut log = DayLog::new();
        let first = entry(&mut log, 300.0);
        let second = entry(&mut log, 450.0);
        log.append(first.clone());
        log.append(second.clone());

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].id, second.id);
        assert_eq!(log.entries()[1].id, first.id);
        assert!((log.totals().calories - 750.0).abs() < 0.001);
        assert!((log.totals().protein - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_remove_restores_previous_totals() {
        let mut log = DayLog::new();
        let keep = entry(&mut log, 300.0);
        let drop = entry(&mut log, 450.0);
        log.append(keep);
        let before = log.totals();
        log.append(drop.clone());

        let removed = log.remove(drop.id);
        assert_eq!(removed, Some(drop));
        assert_eq!(log.totals(), before);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut log = DayLog::new();
        let e = entry(&mut log, 300.0);
        log.append(e);
        let before = log.totals();

        assert_eq!(log.remove(9999), None);
        assert_eq!(log.totals(), before);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_totals_match_entry_sum_after_churn() {
        let mut log = DayLog::new();
        let mut ids = Vec::new();
        for calories in [120.0, 250.0, 90.0, 610.0, 45.0] {
            let e = entry(&mut log, calories);
            ids.push(e.id);
            log.append(e);
        }
        log.remove(ids[1]);
        log.remove(ids[3]);
        log.remove(777); // never existed

        let resummed: Macros = log.entries().iter().map(|e| e.macros).sum();
        assert!((log.totals().calories - resummed.calories).abs() < 0.001);
        assert!((log.totals().protein - resummed.protein).abs() < 0.001);
        assert!((log.totals().carbs - resummed.carbs).abs() < 0.001);
        assert!((log.totals().fat - resummed.fat).abs() < 0.001);
    }

    #[test]
    fn test_minted_ids_are_unique() {
        let mut log = DayLog::new();
        let a = log.mint_id();
        let b = log.mint_id();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_goal_progress() {
        let mut log = DayLog::new();
        assert!(!log.goal_reached());
        assert!((log.calories_remaining() - DAILY_CALORIE_GOAL).abs() < 0.001);

        let e = entry(&mut log, 2100.0);
        log.append(e);
        assert!(log.goal_reached());
        assert_eq!(log.calories_remaining(), 0.0);
    }
}
