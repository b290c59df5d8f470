//! MacroLog Library
//!
//! Photo-based meal logging: scan a nutrition label, extract per-100g
//! macros through a vision model, scale to a portion, and track daily
//! totals.

pub mod analyzer;
pub mod build_info;
pub mod capture;
pub mod db;
pub mod mcp;
pub mod models;
pub mod tools;
