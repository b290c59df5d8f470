//! Analyzer settings MCP tools
//!
//! Manage the vision API credential and provider selection. The full key
//! is never echoed back; status responses carry a short masked preview.

use serde::Serialize;
use tracing::info;

use crate::analyzer::Provider;
use crate::db::Database;
use crate::models::AnalyzerSettings;

/// Response for set_api_key
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub saved: bool,
    pub key_preview: String,
    pub provider: Provider,
}

/// Response for get_analyzer_settings
#[derive(Debug, Serialize)]
pub struct AnalyzerSettingsResponse {
    pub configured: bool,
    pub key_preview: Option<String>,
    pub provider: Provider,
}

/// Response for clear_api_key
#[derive(Debug, Serialize)]
pub struct ClearApiKeyResponse {
    pub cleared: bool,
}

/// Response for set_provider
#[derive(Debug, Serialize)]
pub struct SetProviderResponse {
    pub provider: Provider,
}

/// First four characters plus a fixed tail, enough to recognize a key
/// without exposing it.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}...", prefix)
}

/// Save or replace the analyzer credential
pub fn set_api_key(database: &Database, key: &str) -> Result<SetApiKeyResponse, String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key cannot be empty".to_string());
    }

    let conn = database.get_conn().map_err(|e| e.to_string())?;
    AnalyzerSettings::save_api_key(&conn, key).map_err(|e| e.to_string())?;
    let provider = AnalyzerSettings::provider(&conn).map_err(|e| e.to_string())?;

    info!(preview = %mask_key(key), "analyzer API key saved");

    Ok(SetApiKeyResponse {
        saved: true,
        key_preview: mask_key(key),
        provider,
    })
}

/// Current credential status (masked) and provider selection
pub fn get_analyzer_settings(database: &Database) -> Result<AnalyzerSettingsResponse, String> {
    let conn = database.get_conn().map_err(|e| e.to_string())?;
    let key = AnalyzerSettings::api_key(&conn).map_err(|e| e.to_string())?;
    let provider = AnalyzerSettings::provider(&conn).map_err(|e| e.to_string())?;

    Ok(AnalyzerSettingsResponse {
        configured: key.is_some(),
        key_preview: key.as_deref().map(mask_key),
        provider,
    })
}

/// Delete the stored credential
pub fn clear_api_key(database: &Database) -> Result<ClearApiKeyResponse, String> {
    let conn = database.get_conn().map_err(|e| e.to_string())?;
    let cleared = AnalyzerSettings::clear_api_key(&conn).map_err(|e| e.to_string())?;

    if cleared {
        info!("analyzer API key cleared");
    }

    Ok(ClearApiKeyResponse { cleared })
}

/// Select which vision API backs label analysis
pub fn set_provider(database: &Database, name: &str) -> Result<SetProviderResponse, String> {
    let provider = Provider::from_str(name).ok_or_else(|| {
        format!(
            "Unknown provider '{}'. Accepted values: gemini, groq, openai",
            name
        )
    })?;

    let conn = database.get_conn().map_err(|e| e.to_string())?;
    AnalyzerSettings::set_provider(&conn, provider).map_err(|e| e.to_string())?;

    info!(provider = provider.as_str(), "analyzer provider selected");

    Ok(SetProviderResponse { provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        let conn = db.get_conn().unwrap();
        crate::db::migrations::run_migrations(&conn).unwrap();
        db
    }

    #[test]
    fn test_set_and_read_api_key_masked() {
        let db = test_db();

        let before = get_analyzer_settings(&db).unwrap();
        assert!(!before.configured);
        assert_eq!(before.key_preview, None);

        let saved = set_api_key(&db, "  AIzaSyExample123  ").unwrap();
        assert!(saved.saved);
        assert_eq!(saved.key_preview, "AIza...");

        let after = get_analyzer_settings(&db).unwrap();
        assert!(after.configured);
        assert_eq!(after.key_preview.as_deref(), Some("AIza..."));
    }

    #[test]
    fn test_blank_key_rejected() {
        let db = test_db();
        let err = set_api_key(&db, "   ").unwrap_err();
        assert!(err.contains("empty"));
        assert!(!get_analyzer_settings(&db).unwrap().configured);
    }

    #[test]
    fn test_clear_reports_whether_key_existed() {
        let db = test_db();
        assert!(!clear_api_key(&db).unwrap().cleared);

        set_api_key(&db, "gsk_abc").unwrap();
        assert!(clear_api_key(&db).unwrap().cleared);
        assert!(!get_analyzer_settings(&db).unwrap().configured);
    }

    #[test]
    fn test_set_provider_roundtrip() {
        let db = test_db();
        assert_eq!(get_analyzer_settings(&db).unwrap().provider, Provider::Gemini);

        let resp = set_provider(&db, "groq").unwrap();
        assert_eq!(resp.provider, Provider::Groq);
        assert_eq!(get_analyzer_settings(&db).unwrap().provider, Provider::Groq);
    }

    #[test]
    fn test_unknown_provider_lists_accepted_values() {
        let db = test_db();
        let err = set_provider(&db, "llava").unwrap_err();
        assert!(err.contains("gemini, groq, openai"));
        assert_eq!(get_analyzer_settings(&db).unwrap().provider, Provider::Gemini);
    }

    #[test]
    fn test_short_key_mask_does_not_panic() {
        let db = test_db();
        let saved = set_api_key(&db, "ab").unwrap();
        assert_eq!(saved.key_preview, "ab...");
    }
}
