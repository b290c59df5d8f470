//! MacroLog MCP Server Implementation
//!
//! Implements the MCP server with the capture workflow, day log, settings,
//! and status tools. Shared state lives here: one optional capture session
//! behind an async mutex (held across the analyzer call, which is what
//! keeps analyses serialized) and the in-memory day log behind a plain
//! mutex that is never held across an await.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::analyzer;
use crate::capture::Session;
use crate::db::Database;
use crate::models::{AnalyzerSettings, DayLog};
use crate::tools::capture::{self, ImageSource};
use crate::tools::log;
use crate::tools::settings;
use crate::tools::status::StatusTracker;

/// MacroLog MCP Service
#[derive(Clone)]
pub struct MacrologService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    session: Arc<Mutex<Option<Session>>>,
    day_log: Arc<std::sync::Mutex<DayLog>>,
    tool_router: ToolRouter<MacrologService>,
}

impl MacrologService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            session: Arc::new(Mutex::new(None)),
            day_log: Arc::new(std::sync::Mutex::new(DayLog::new())),
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanLabelParams {
    /// Base64-encoded label photo. A data URL prefix is accepted.
    pub image_base64: Option<String>,
    /// Path to a label photo on disk. Provide this or image_base64, not both.
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPortionParams {
    /// Portion size in grams
    pub grams: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveEntryParams {
    /// Entry ID to remove
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetApiKeyParams {
    /// Vision API key for the selected provider
    pub api_key: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetProviderParams {
    /// Analyzer provider: gemini, groq, or openai
    pub provider: String,
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl MacrologService {
    // --- Status ---

    #[tool(description = "Get the current status of the MacroLog service including build info, database status, and process information")]
    async fn service_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status();
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get step-by-step instructions for logging a meal from a nutrition label photo. Call this when starting a new capture session or when unsure how to use the capture tools.")]
    fn capture_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::CAPTURE_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(CAPTURE_INSTRUCTIONS)]))
    }

    // --- Capture workflow ---

    #[tool(description = "Open a capture session at the scan step. Fails if a session is already open.")]
    async fn start_capture(&self) -> Result<CallToolResult, McpError> {
        let result = capture::start_capture(&self.session)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Report the current capture session step and its data (error text, scanned macros, entered portion, summary)")]
    async fn capture_status(&self) -> Result<CallToolResult, McpError> {
        let result = capture::capture_status(&self.session).await;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Analyze a nutrition label photo with the configured vision provider and move to the grams step. Provide exactly one of image_base64 or image_path. Requires an API key saved via set_api_key.")]
    async fn scan_label(&self, Parameters(p): Parameters<ScanLabelParams>) -> Result<CallToolResult, McpError> {
        let source = match (p.image_base64, p.image_path) {
            (Some(data), None) => ImageSource::Base64(data),
            (None, Some(path)) => ImageSource::Path(PathBuf::from(path)),
            (Some(_), Some(_)) => {
                return Err(McpError::invalid_params(
                    "Provide either image_base64 or image_path, not both",
                    None,
                ))
            }
            (None, None) => {
                return Err(McpError::invalid_params(
                    "Provide either image_base64 or image_path",
                    None,
                ))
            }
        };

        // Credential and provider come from settings at scan time, so a key
        // saved mid-session is picked up without a restart.
        let (api_key, provider) = {
            let conn = self
                .database
                .get_conn()
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            let key = AnalyzerSettings::api_key(&conn)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            let provider = AnalyzerSettings::provider(&conn)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            (key, provider)
        };

        let analyzer = analyzer::for_provider(provider);
        let result = capture::scan_label(&self.session, analyzer.as_ref(), api_key.as_deref(), source)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Skip the scan and continue to the grams step with demo per-100g macros (no analyzer call)")]
    async fn use_demo_data(&self) -> Result<CallToolResult, McpError> {
        let result = capture::use_demo_data(&self.session)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Enter the portion size in grams at the grams step. Quick-select values are 50, 100, 150, 200, and 300. The value stays editable; validation happens at confirm_portion.")]
    async fn set_portion(&self, Parameters(p): Parameters<SetPortionParams>) -> Result<CallToolResult, McpError> {
        let result = capture::set_portion(&self.session, p.grams)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Validate the entered portion and move to the summary step showing the scaled macros")]
    async fn confirm_portion(&self) -> Result<CallToolResult, McpError> {
        let result = capture::confirm_portion(&self.session)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Step backwards in the capture workflow (summary to grams, grams to scan)")]
    async fn go_back(&self) -> Result<CallToolResult, McpError> {
        let result = capture::go_back(&self.session)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Discard the open capture session without logging anything. Safe to call when no session is open.")]
    async fn cancel_capture(&self) -> Result<CallToolResult, McpError> {
        let result = capture::cancel_capture(&self.session).await;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Commit the summary to the day log and close the capture session. Returns the logged entry and updated daily totals.")]
    async fn log_meal(&self) -> Result<CallToolResult, McpError> {
        let result = capture::log_meal(&self.session, &self.day_log)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Day log ---

    #[tool(description = "Get today's running macro totals against the daily calorie goal")]
    fn get_daily_totals(&self) -> Result<CallToolResult, McpError> {
        let result = log::get_daily_totals(&self.day_log);
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List every entry logged today, newest first, with totals")]
    fn list_entries(&self) -> Result<CallToolResult, McpError> {
        let result = log::list_entries(&self.day_log);
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Remove a logged entry by ID and subtract its macros from the totals. Unknown IDs are a no-op.")]
    fn remove_entry(&self, Parameters(p): Parameters<RemoveEntryParams>) -> Result<CallToolResult, McpError> {
        let result = log::remove_entry(&self.day_log, p.id);
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Settings ---

    #[tool(description = "Save the vision API key used for label analysis")]
    fn set_api_key(&self, Parameters(p): Parameters<SetApiKeyParams>) -> Result<CallToolResult, McpError> {
        let result = settings::set_api_key(&self.database, &p.api_key)
            .map_err(|e| McpError::invalid_params(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get the analyzer settings: whether a key is configured (masked preview only) and the selected provider")]
    fn get_analyzer_settings(&self) -> Result<CallToolResult, McpError> {
        let result = settings::get_analyzer_settings(&self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Delete the stored vision API key")]
    fn clear_api_key(&self) -> Result<CallToolResult, McpError> {
        let result = settings::clear_api_key(&self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Select the vision provider for label analysis: gemini (default), groq, or openai")]
    fn set_provider(&self, Parameters(p): Parameters<SetProviderParams>) -> Result<CallToolResult, McpError> {
        let result = settings::set_provider(&self.database, &p.provider)
            .map_err(|e| McpError::invalid_params(e, None))?;
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for MacrologService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "macrolog".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("MacroLog".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MacroLog - Photo-based meal logging and daily macro tracking. \
                 IMPORTANT: Call capture_instructions when starting a capture session. \
                 Capture: start_capture, capture_status, scan_label (image_base64 or image_path), \
                 use_demo_data, set_portion, confirm_portion, go_back, cancel_capture, log_meal. \
                 Day log: get_daily_totals, list_entries, remove_entry. \
                 Settings: set_api_key, get_analyzer_settings, clear_api_key, set_provider \
                 (gemini/groq/openai). \
                 scan_label needs an API key saved first; use_demo_data works without one."
                    .into(),
            ),
        }
    }
}
