//! Capture session state machine
//!
//! One session walks a label photo from scan to committed entry:
//!
//!   scan -> scanning -> grams -> summary -> logging
//!
//! Each step is an enum variant holding exactly the data that step needs,
//! so illegal states (a summary without validated grams, a scan error
//! alongside a staged image) cannot be represented. Transitions called at
//! the wrong step fail without touching the session.

use serde::Serialize;
use thiserror::Error;

use crate::analyzer::LabelImage;
use crate::models::{FoodEntry, Macros, FALLBACK_FOOD_NAME, FALLBACK_PER_100G, SCANNED_FOOD_NAME};

/// Quick-select portion suggestions offered at the grams step.
pub const QUICK_PORTIONS_G: [f64; 5] = [50.0, 100.0, 150.0, 200.0, 300.0];

/// Workflow step names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Scan,
    Scanning,
    Grams,
    Summary,
    Logging,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Scan => "scan",
            Step::Scanning => "scanning",
            Step::Grams => "grams",
            Step::Summary => "summary",
            Step::Logging => "logging",
        };
        write!(f, "{}", name)
    }
}

/// Where the per-100g macros came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MacroBasis {
    /// Extracted from the label photo by the analyzer
    Scanned(Macros),
    /// Demo values, no photo involved
    Fallback,
}

impl MacroBasis {
    pub fn per_100g(&self) -> Macros {
        match self {
            MacroBasis::Scanned(macros) => *macros,
            MacroBasis::Fallback => FALLBACK_PER_100G,
        }
    }

    pub fn entry_name(&self) -> &'static str {
        match self {
            MacroBasis::Scanned(_) => SCANNED_FOOD_NAME,
            MacroBasis::Fallback => FALLBACK_FOOD_NAME,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            MacroBasis::Scanned(_) => "scanned",
            MacroBasis::Fallback => "fallback",
        }
    }
}

/// What the summary step will commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealPreview {
    pub name: String,
    pub grams: f64,
    pub macros: Macros,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("only available at the {expected} step (session is at {actual})")]
    WrongStep {
        expected: &'static str,
        actual: Step,
    },
    #[error("portion must be a positive number of grams")]
    InvalidPortion,
}

/// A single in-flight capture
#[derive(Debug)]
pub enum Session {
    Scan { error: Option<String> },
    Scanning { image: LabelImage },
    Grams { basis: MacroBasis, grams: Option<f64> },
    Summary { basis: MacroBasis, grams: f64 },
    Logging { entry: FoodEntry },
}

fn valid_portion(grams: f64) -> bool {
    grams.is_finite() && grams > 0.0
}

impl Session {
    /// Open a fresh session at the scan step.
    pub fn new() -> Self {
        Session::Scan { error: None }
    }

    pub fn step(&self) -> Step {
        match self {
            Session::Scan { .. } => Step::Scan,
            Session::Scanning { .. } => Step::Scanning,
            Session::Grams { .. } => Step::Grams,
            Session::Summary { .. } => Step::Summary,
            Session::Logging { .. } => Step::Logging,
        }
    }

    /// Error text from the last failed scan attempt, if any.
    pub fn scan_error(&self) -> Option<&str> {
        match self {
            Session::Scan { error } => error.as_deref(),
            _ => None,
        }
    }

    /// The image staged for analysis.
    pub fn scanning_image(&self) -> Option<&LabelImage> {
        match self {
            Session::Scanning { image } => Some(image),
            _ => None,
        }
    }

    pub fn basis(&self) -> Option<&MacroBasis> {
        match self {
            Session::Grams { basis, .. } | Session::Summary { basis, .. } => Some(basis),
            _ => None,
        }
    }

    pub fn grams(&self) -> Option<f64> {
        match self {
            Session::Grams { grams, .. } => *grams,
            Session::Summary { grams, .. } => Some(*grams),
            _ => None,
        }
    }

    /// Whether the entered portion would pass confirmation.
    pub fn can_continue(&self) -> bool {
        matches!(self, Session::Grams { grams: Some(g), .. } if valid_portion(*g))
    }

    /// Stage an image and move scan -> scanning.
    pub fn begin_scan(&mut self, image: LabelImage) -> Result<(), SessionError> {
        match self {
            Session::Scan { .. } => {
                *self = Session::Scanning { image };
                Ok(())
            }
            _ => Err(self.wrong_step("scan")),
        }
    }

    /// Analysis succeeded: scanning -> grams with the scanned basis.
    pub fn complete_scan(&mut self, per_100g: Macros) -> Result<(), SessionError> {
        match self {
            Session::Scanning { .. } => {
                *self = Session::Grams {
                    basis: MacroBasis::Scanned(per_100g),
                    grams: None,
                };
                Ok(())
            }
            _ => Err(self.wrong_step("scanning")),
        }
    }

    /// Record a failed attempt and settle back at scan. Works from scan
    /// (image never staged) and scanning (staged image is dropped here).
    pub fn fail_scan(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        match self {
            Session::Scan { .. } | Session::Scanning { .. } => {
                *self = Session::Scan {
                    error: Some(message.into()),
                };
                Ok(())
            }
            _ => Err(self.wrong_step("scan or scanning")),
        }
    }

    /// Skip analysis entirely: scan -> grams with the demo basis.
    pub fn use_fallback(&mut self) -> Result<(), SessionError> {
        match self {
            Session::Scan { .. } => {
                *self = Session::Grams {
                    basis: MacroBasis::Fallback,
                    grams: None,
                };
                Ok(())
            }
            _ => Err(self.wrong_step("scan")),
        }
    }

    /// Store the entered portion. Any number is stored; validation happens
    /// at confirmation so the caller can keep editing a bad value.
    pub fn set_portion(&mut self, entered: f64) -> Result<(), SessionError> {
        match self {
            Session::Grams { grams, .. } => {
                *grams = Some(entered);
                Ok(())
            }
            _ => Err(self.wrong_step("grams")),
        }
    }

    /// Lock in the portion: grams -> summary. Rejects missing, zero,
    /// negative, or non-finite grams and stays put.
    pub fn confirm_portion(&mut self) -> Result<(), SessionError> {
        match self {
            Session::Grams { basis, grams } => match grams {
                Some(g) if valid_portion(*g) => {
                    *self = Session::Summary {
                        basis: *basis,
                        grams: *g,
                    };
                    Ok(())
                }
                _ => Err(SessionError::InvalidPortion),
            },
            _ => Err(self.wrong_step("grams")),
        }
    }

    /// Step backwards: summary -> grams (portion kept editable), grams ->
    /// scan (basis discarded).
    pub fn go_back(&mut self) -> Result<(), SessionError> {
        match self {
            Session::Summary { basis, grams } => {
                *self = Session::Grams {
                    basis: *basis,
                    grams: Some(*grams),
                };
                Ok(())
            }
            Session::Grams { .. } => {
                *self = Session::Scan { error: None };
                Ok(())
            }
            _ => Err(self.wrong_step("grams or summary")),
        }
    }

    /// The entry the summary step would commit.
    pub fn preview(&self) -> Option<MealPreview> {
        match self {
            Session::Summary { basis, grams } => Some(MealPreview {
                name: basis.entry_name().to_string(),
                grams: *grams,
                macros: basis.per_100g().for_portion(*grams),
            }),
            _ => None,
        }
    }

    /// Commit the summary into an entry: summary -> logging. The returned
    /// entry is what the caller appends to the day log.
    pub fn finalize(&mut self, id: i64) -> Result<FoodEntry, SessionError> {
        match self {
            Session::Summary { basis, grams } => {
                let entry = FoodEntry::new(
                    id,
                    basis.entry_name(),
                    *grams,
                    basis.per_100g().for_portion(*grams),
                );
                *self = Session::Logging {
                    entry: entry.clone(),
                };
                Ok(entry)
            }
            _ => Err(self.wrong_step("summary")),
        }
    }

    pub fn logged_entry(&self) -> Option<&FoodEntry> {
        match self {
            Session::Logging { entry } => Some(entry),
            _ => None,
        }
    }

    fn wrong_step(&self, expected: &'static str) -> SessionError {
        SessionError::WrongStep {
            expected,
            actual: self.step(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
