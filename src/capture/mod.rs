//! Capture workflow module
//!
//! The state machine that walks a label photo from scan to logged entry.

pub mod session;

pub use session::{MacroBasis, MealPreview, Session, SessionError, Step, QUICK_PORTIONS_G};
