//! Service status tool
//!
//! Runtime status information about the MacroLog service, plus the usage
//! guide surfaced through the capture_instructions tool.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Capture workflow instructions for AI assistants
pub const CAPTURE_INSTRUCTIONS: &str = r#"
# MacroLog Capture Instructions

This guide explains how to log a meal from a nutrition label photo.

## Overview

A capture session walks five steps:

1. **scan** - waiting for a label photo
2. **scanning** - the photo is with the vision analyzer
3. **grams** - enter the portion size
4. **summary** - review the scaled macros
5. **logging** - the entry is committed

Exactly one session can be open at a time, and exactly one analysis call
is ever in flight.

## Logging a Meal

1. Call `start_capture` to open a session at the scan step.
2. Call `scan_label` with either `image_base64` (a base64 payload, data
   URL prefix accepted) or `image_path` (a file on disk). The analyzer
   returns calories, protein, carbs, and fat per 100g.
   - If no API key is configured the session closes and the response sets
     `settings_required: true`. Save a key with `set_api_key` and start
     over.
   - If analysis fails the session returns to the scan step with the
     error message. Retry with `scan_label` or fall back to
     `use_demo_data`.
3. Call `set_portion` with the portion size in grams. Quick-select values
   are 50, 100, 150, 200, and 300. Zero and negative portions are
   rejected at the next step, not here, so the value stays editable.
4. Call `confirm_portion` to see the summary: per-100g values scaled by
   grams/100, each macro rounded to the nearest whole number.
5. Call `log_meal` to commit. The entry is added to the day log, totals
   update, and the session closes.

`go_back` steps backwards (summary -> grams -> scan); `cancel_capture`
discards the session at any step without logging anything.

## Skipping the Scan

`use_demo_data` jumps straight from scan to grams with demo per-100g
values (200 kcal, 13g protein, 23g carbs, 5g fat) named
"Grilled Chicken & Rice". No analyzer call is made.

## Reviewing the Day

- `get_daily_totals` - running macro totals against the 2000 kcal goal
- `list_entries` - every entry logged today, newest first
- `remove_entry` - delete an entry by id; totals adjust down

The day log lives in memory for the current process. Only settings
persist across restarts.

## Settings

- `set_api_key` - save the vision API credential
- `get_analyzer_settings` - masked key preview plus the provider
- `clear_api_key` - forget the credential
- `set_provider` - choose gemini (default), groq, or openai
"#;

/// Complete status information for the service
#[derive(Debug, Serialize)]
pub struct MacrologStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> MacrologStatus {
        let build_info = BuildInfo::current();

        // Get database size if it exists
        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MacrologStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
