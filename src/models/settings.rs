//! Analyzer settings model
//!
//! Persisted key-value slots for the analyzer credential and the provider
//! selection. Stored in SQLite so they survive restarts and can be seeded
//! from outside an MCP session.

use rusqlite::{params, Connection};

use crate::analyzer::Provider;
use crate::db::DbResult;

const API_KEY_SLOT: &str = "analyzer_api_key";
const PROVIDER_SLOT: &str = "analyzer_provider";

/// Accessors for the analyzer settings slots
pub struct AnalyzerSettings;

impl AnalyzerSettings {
    fn get_slot(conn: &Connection, key: &str) -> DbResult<Option<String>> {
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;

        let result = stmt.query_row(params![key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_slot(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// Stored analyzer credential, if one has been saved
    pub fn api_key(conn: &Connection) -> DbResult<Option<String>> {
        Self::get_slot(conn, API_KEY_SLOT)
    }

    /// Save or replace the analyzer credential (callers trim and validate)
    pub fn save_api_key(conn: &Connection, key: &str) -> DbResult<()> {
        Self::set_slot(conn, API_KEY_SLOT, key)
    }

    /// Delete the credential. Returns whether one was stored.
    pub fn clear_api_key(conn: &Connection) -> DbResult<bool> {
        let rows = conn.execute(
            "DELETE FROM settings WHERE key = ?1",
            params![API_KEY_SLOT],
        )?;
        Ok(rows > 0)
    }

    /// Selected provider. Unset or unrecognized values fall back to the
    /// default so an old database never blocks startup.
    pub fn provider(conn: &Connection) -> DbResult<Provider> {
        Ok(Self::get_slot(conn, PROVIDER_SLOT)?
            .and_then(|name| Provider::from_str(&name))
            .unwrap_or_default())
    }

    pub fn set_provider(conn: &Connection, provider: Provider) -> DbResult<()> {
        Self::set_slot(conn, PROVIDER_SLOT, provider.as_str())
    }
}
