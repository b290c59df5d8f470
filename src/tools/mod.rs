//! MacroLog tools module
//!
//! MCP tool implementations: the capture workflow, the day log, analyzer
//! settings, and service status.

pub mod capture;
pub mod log;
pub mod settings;
pub mod status;
