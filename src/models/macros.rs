//! Shared macro data structure
//!
//! Used across scanned labels, food entries, and day totals.

use serde::{Deserialize, Serialize};

/// Demo macros used when a scan is skipped, per 100 grams.
pub const FALLBACK_PER_100G: Macros = Macros {
    calories: 200.0,
    protein: 13.0,
    carbs: 23.0,
    fat: 5.0,
};

/// Entry name for the demo basis.
pub const FALLBACK_FOOD_NAME: &str = "Grilled Chicken & Rice";

/// Entry name for macros extracted from a label photo.
pub const SCANNED_FOOD_NAME: &str = "Scanned Food";

/// Macronutrient totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
}

impl Macros {
    /// Create a new Macros with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale macro values by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
        }
    }

    /// Macros for a portion of the given size, taking self as per-100g
    /// values. Each component rounds to the nearest whole number, halves
    /// away from zero.
    pub fn for_portion(&self, grams: f64) -> Self {
        let scaled = self.scale(grams / 100.0);
        Self {
            calories: scaled.calories.round(),
            protein: scaled.protein.round(),
            carbs: scaled.carbs.round(),
            fat: scaled.fat.round(),
        }
    }

    /// Add another Macros to this one
    pub fn add(&self, other: &Macros) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }

    /// Subtract another Macros from this one, clamping each component at
    /// zero so removals can never drive a total negative.
    pub fn saturating_sub(&self, other: &Macros) -> Self {
        Self {
            calories: (self.calories - other.calories).max(0.0),
            protein: (self.protein - other.protein).max(0.0),
            carbs: (self.carbs - other.carbs).max(0.0),
            fat: (self.fat - other.fat).max(0.0),
        }
    }
}

impl std::ops::Add for Macros {
    type Output = Macros;

    fn add(self, other: Macros) -> Macros {
        Macros::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for Macros {
    type Output = Macros;

    fn mul(self, multiplier: f64) -> Macros {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Macros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Macros::zero(), |acc, m| acc + m)
    }
}
