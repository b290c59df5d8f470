//! Capture workflow MCP tools
//!
//! The guided scan-to-log flow. These functions own the orchestration:
//! credential lookup happens before any image is staged, the session lock
//! is held across the analyzer call so only one analysis is ever in
//! flight, and a commit both updates the day log and closes the session.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::analyzer::{AnalyzerError, LabelAnalyzer, LabelImage};
use crate::capture::{MealPreview, Session, Step, QUICK_PORTIONS_G};
use crate::models::{
    DayLog, FoodEntry, Macros, DAILY_CALORIE_GOAL, FALLBACK_FOOD_NAME, FALLBACK_PER_100G,
};

const NO_SESSION: &str = "No capture session is open. Call start_capture first.";

/// Where the label photo comes from
#[derive(Debug)]
pub enum ImageSource {
    /// Base64 payload, with or without a data URL prefix
    Base64(String),
    /// Path to an image file on disk
    Path(PathBuf),
}

impl ImageSource {
    async fn into_label_image(self) -> Result<LabelImage, String> {
        match self {
            ImageSource::Base64(data) => LabelImage::from_base64(&data).map_err(|e| e.to_string()),
            ImageSource::Path(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| format!("Failed to read image file: {}", e))?;
                LabelImage::from_bytes(&bytes).map_err(|e| e.to_string())
            }
        }
    }
}

/// Response for start_capture
#[derive(Debug, Serialize)]
pub struct StartCaptureResponse {
    pub step: Step,
}

/// Response for capture_status
#[derive(Debug, Serialize)]
pub struct CaptureStatusResponse {
    pub open: bool,
    pub step: Option<Step>,
    pub error: Option<String>,
    pub source: Option<&'static str>, // "scanned" or "fallback"
    pub per_100g: Option<Macros>,
    pub grams: Option<f64>,
    pub can_continue: Option<bool>,
    pub quick_portions_g: Option<[f64; 5]>,
    pub summary: Option<MealPreview>,
}

/// Response for scan_label
#[derive(Debug, Serialize)]
pub struct ScanLabelResponse {
    pub success: bool,
    /// None when the session was closed (missing credential)
    pub step: Option<Step>,
    pub per_100g: Option<Macros>,
    pub error: Option<String>,
    pub settings_required: bool,
}

/// Response for use_demo_data
#[derive(Debug, Serialize)]
pub struct UseDemoDataResponse {
    pub step: Step,
    pub name: &'static str,
    pub per_100g: Macros,
    pub quick_portions_g: [f64; 5],
}

/// Response for set_portion
#[derive(Debug, Serialize)]
pub struct SetPortionResponse {
    pub grams: f64,
    pub can_continue: bool,
}

/// Response for confirm_portion
#[derive(Debug, Serialize)]
pub struct ConfirmPortionResponse {
    pub step: Step,
    pub summary: MealPreview,
}

/// Response for go_back
#[derive(Debug, Serialize)]
pub struct GoBackResponse {
    pub step: Step,
}

/// Response for cancel_capture
#[derive(Debug, Serialize)]
pub struct CancelCaptureResponse {
    pub was_open: bool,
}

/// Response for log_meal
#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub entry: FoodEntry,
    pub totals: Macros,
    pub daily_goal: f64,
    pub calories_remaining: f64,
    pub goal_reached: bool,
    pub entry_count: usize,
}

// ============================================================================
// Session lifecycle
// ============================================================================

/// Open a capture session at the scan step
pub async fn start_capture(
    session: &Mutex<Option<Session>>,
) -> Result<StartCaptureResponse, String> {
    let mut slot = session.lock().await;
    if slot.is_some() {
        return Err(
            "A capture session is already open. Finish it or call cancel_capture first."
                .to_string(),
        );
    }

    *slot = Some(Session::new());
    Ok(StartCaptureResponse { step: Step::Scan })
}

/// Report the current step and its data
pub async fn capture_status(session: &Mutex<Option<Session>>) -> CaptureStatusResponse {
    let slot = session.lock().await;

    let mut status = CaptureStatusResponse {
        open: slot.is_some(),
        step: None,
        error: None,
        source: None,
        per_100g: None,
        grams: None,
        can_continue: None,
        quick_portions_g: None,
        summary: None,
    };

    let Some(sess) = slot.as_ref() else {
        return status;
    };

    status.step = Some(sess.step());
    match sess.step() {
        Step::Scan => {
            status.error = sess.scan_error().map(str::to_string);
        }
        Step::Scanning => {}
        Step::Grams => {
            status.source = sess.basis().map(|b| b.source());
            status.per_100g = sess.basis().map(|b| b.per_100g());
            status.grams = sess.grams();
            status.can_continue = Some(sess.can_continue());
            status.quick_portions_g = Some(QUICK_PORTIONS_G);
        }
        Step::Summary => {
            status.source = sess.basis().map(|b| b.source());
            status.per_100g = sess.basis().map(|b| b.per_100g());
            status.grams = sess.grams();
            status.summary = sess.preview();
        }
        Step::Logging => {}
    }

    status
}

/// Discard the session, whatever step it is at. Safe to call when nothing
/// is open.
pub async fn cancel_capture(session: &Mutex<Option<Session>>) -> CancelCaptureResponse {
    let mut slot = session.lock().await;
    CancelCaptureResponse {
        was_open: slot.take().is_some(),
    }
}

// ============================================================================
// Scan step
// ============================================================================

/// Analyze a label photo. The session lock stays held across the analyzer
/// call, so a second scan waits for the first to resolve.
pub async fn scan_label(
    session: &Mutex<Option<Session>>,
    analyzer: &dyn LabelAnalyzer,
    api_key: Option<&str>,
    source: ImageSource,
) -> Result<ScanLabelResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    if sess.step() != Step::Scan {
        return Err(format!(
            "scan_label is only available at the scan step (session is at {})",
            sess.step()
        ));
    }

    // No credential means no analysis: the session closes and the caller
    // is pointed at settings.
    let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
        *slot = None;
        return Ok(ScanLabelResponse {
            success: false,
            step: None,
            per_100g: None,
            error: Some(AnalyzerError::MissingCredential.to_string()),
            settings_required: true,
        });
    };

    let image = match source.into_label_image().await {
        Ok(image) => image,
        Err(message) => {
            sess.fail_scan(message.clone()).map_err(|e| e.to_string())?;
            return Ok(ScanLabelResponse {
                success: false,
                step: Some(Step::Scan),
                per_100g: None,
                error: Some(message),
                settings_required: false,
            });
        }
    };

    sess.begin_scan(image).map_err(|e| e.to_string())?;
    info!(provider = analyzer.provider().as_str(), "analyzing label photo");

    let result = {
        let image = sess.scanning_image().ok_or("No image staged for analysis")?;
        analyzer.analyze(image, key).await
    };

    match result {
        Ok(per_100g) => {
            sess.complete_scan(per_100g).map_err(|e| e.to_string())?;
            Ok(ScanLabelResponse {
                success: true,
                step: Some(Step::Grams),
                per_100g: Some(per_100g),
                error: None,
                settings_required: false,
            })
        }
        Err(err) => {
            let message = err.to_string();
            warn!(
                provider = analyzer.provider().as_str(),
                error = %message,
                "label analysis failed"
            );
            sess.fail_scan(message.clone()).map_err(|e| e.to_string())?;
            Ok(ScanLabelResponse {
                success: false,
                step: Some(Step::Scan),
                per_100g: None,
                error: Some(message),
                settings_required: false,
            })
        }
    }
}

/// Skip the scan and use the demo basis
pub async fn use_demo_data(
    session: &Mutex<Option<Session>>,
) -> Result<UseDemoDataResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    sess.use_fallback().map_err(|e| e.to_string())?;
    Ok(UseDemoDataResponse {
        step: Step::Grams,
        name: FALLBACK_FOOD_NAME,
        per_100g: FALLBACK_PER_100G,
        quick_portions_g: QUICK_PORTIONS_G,
    })
}

// ============================================================================
// Portion and summary steps
// ============================================================================

/// Store the entered portion size
pub async fn set_portion(
    session: &Mutex<Option<Session>>,
    grams: f64,
) -> Result<SetPortionResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    sess.set_portion(grams).map_err(|e| e.to_string())?;
    Ok(SetPortionResponse {
        grams,
        can_continue: sess.can_continue(),
    })
}

/// Validate the portion and move to the summary step
pub async fn confirm_portion(
    session: &Mutex<Option<Session>>,
) -> Result<ConfirmPortionResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    sess.confirm_portion().map_err(|e| e.to_string())?;
    let summary = sess.preview().ok_or("Summary is missing its preview")?;
    Ok(ConfirmPortionResponse {
        step: Step::Summary,
        summary,
    })
}

/// Step backwards (summary -> grams, grams -> scan)
pub async fn go_back(session: &Mutex<Option<Session>>) -> Result<GoBackResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    sess.go_back().map_err(|e| e.to_string())?;
    Ok(GoBackResponse { step: sess.step() })
}

/// Commit the summary to the day log and close the session
pub async fn log_meal(
    session: &Mutex<Option<Session>>,
    day_log: &std::sync::Mutex<DayLog>,
) -> Result<LogMealResponse, String> {
    let mut slot = session.lock().await;
    let sess = slot.as_mut().ok_or(NO_SESSION)?;

    if sess.step() != Step::Summary {
        return Err(format!(
            "log_meal is only available at the summary step (session is at {})",
            sess.step()
        ));
    }

    let mut log = day_log.lock().unwrap();
    let id = log.mint_id();
    let entry = sess.finalize(id).map_err(|e| e.to_string())?;
    log.append(entry.clone());

    let totals = log.totals();
    let calories_remaining = log.calories_remaining();
    let goal_reached = log.goal_reached();
    let entry_count = log.len();
    drop(log);

    info!(id = entry.id, name = %entry.name, grams = entry.grams, "meal logged");

    // Entry committed; the session is spent.
    *slot = None;

    Ok(LogMealResponse {
        entry,
        totals,
        daily_goal: DAILY_CALORIE_GOAL,
        calories_remaining,
        goal_reached,
        entry_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Provider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    enum StubBehavior {
        Succeed(Macros),
        Fail(String),
    }

    struct StubAnalyzer {
        behavior: StubBehavior,
        calls: AtomicUsize,
    }

    impl StubAnalyzer {
        fn succeeding(macros: Macros) -> Self {
            Self {
                behavior: StubBehavior::Succeed(macros),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(reason: &str) -> Self {
            Self {
                behavior: StubBehavior::Fail(reason.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LabelAnalyzer for StubAnalyzer {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn analyze(
            &self,
            _image: &LabelImage,
            _api_key: &str,
        ) -> Result<Macros, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                StubBehavior::Succeed(macros) => Ok(*macros),
                StubBehavior::Fail(reason) => Err(AnalyzerError::Malformed {
                    provider: "Gemini",
                    reason: reason.clone(),
                }),
            }
        }
    }

    fn scanned() -> Macros {
        Macros {
            calories: 120.0,
            protein: 6.0,
            carbs: 14.0,
            fat: 4.0,
        }
    }

    fn png_base64() -> ImageSource {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        ImageSource::Base64(STANDARD.encode(PNG_MAGIC))
    }

    #[tokio::test]
    async fn test_scan_happy_path_reaches_grams() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        start_capture(&session).await.unwrap();
        let resp = scan_label(&session, &analyzer, Some("key-123"), png_base64())
            .await
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.step, Some(Step::Grams));
        assert_eq!(resp.per_100g, Some(scanned()));
        assert_eq!(analyzer.call_count(), 1);

        let status = capture_status(&session).await;
        assert!(status.open);
        assert_eq!(status.step, Some(Step::Grams));
        assert_eq!(status.source, Some("scanned"));
        assert_eq!(status.quick_portions_g, Some(QUICK_PORTIONS_G));
    }

    #[tokio::test]
    async fn test_scan_without_credential_closes_session() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        start_capture(&session).await.unwrap();
        let resp = scan_label(&session, &analyzer, None, png_base64())
            .await
            .unwrap();

        assert!(!resp.success);
        assert!(resp.settings_required);
        assert_eq!(resp.step, None);
        assert!(resp.error.unwrap().contains("API key is missing"));
        assert_eq!(analyzer.call_count(), 0);

        let status = capture_status(&session).await;
        assert!(!status.open);
    }

    #[tokio::test]
    async fn test_blank_credential_counts_as_missing() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        start_capture(&session).await.unwrap();
        let resp = scan_label(&session, &analyzer, Some("   "), png_base64())
            .await
            .unwrap();

        assert!(resp.settings_required);
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyzer_failure_returns_to_scan() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::failing("no JSON object in reply text");

        start_capture(&session).await.unwrap();
        let resp = scan_label(&session, &analyzer, Some("key-123"), png_base64())
            .await
            .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.step, Some(Step::Scan));
        assert!(!resp.settings_required);
        assert!(resp.error.unwrap().contains("no JSON object"));

        // Session survives at scan with the error recorded, retry allowed
        let status = capture_status(&session).await;
        assert!(status.open);
        assert_eq!(status.step, Some(Step::Scan));
        assert!(status.error.unwrap().contains("no JSON object"));

        let retry = scan_label(&session, &analyzer, Some("key-123"), png_base64())
            .await
            .unwrap();
        assert!(!retry.success);
        assert_eq!(analyzer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_bad_image_rejected_before_analysis() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        start_capture(&session).await.unwrap();
        let resp = scan_label(
            &session,
            &analyzer,
            Some("key-123"),
            ImageSource::Base64("@@not base64@@".to_string()),
        )
        .await
        .unwrap();

        assert!(!resp.success);
        assert_eq!(resp.step, Some(Step::Scan));
        assert!(resp.error.unwrap().contains("base64"));
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_from_missing_file_stays_at_scan() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        start_capture(&session).await.unwrap();
        let resp = scan_label(
            &session,
            &analyzer,
            Some("key-123"),
            ImageSource::Path(PathBuf::from("/nonexistent/label.png")),
        )
        .await
        .unwrap();

        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("Failed to read image file"));
        assert_eq!(analyzer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scan_from_file_path() {
        let session = Mutex::new(None);
        let analyzer = StubAnalyzer::succeeding(scanned());

        let path = std::env::temp_dir().join("macrolog_label_scan_test.png");
        std::fs::write(&path, PNG_MAGIC).unwrap();

        start_capture(&session).await.unwrap();
        let resp = scan_label(
            &session,
            &analyzer,
            Some("key-123"),
            ImageSource::Path(path.clone()),
        )
        .await
        .unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(resp.success);
        assert_eq!(resp.step, Some(Step::Grams));
    }

    #[tokio::test]
    async fn test_demo_path_logs_without_analyzer() {
        let session = Mutex::new(None);
        let day_log = std::sync::Mutex::new(DayLog::new());

        start_capture(&session).await.unwrap();
        let demo = use_demo_data(&session).await.unwrap();
        assert_eq!(demo.step, Step::Grams);
        assert_eq!(demo.name, FALLBACK_FOOD_NAME);

        let portion = set_portion(&session, 150.0).await.unwrap();
        assert!(portion.can_continue);

        let confirmed = confirm_portion(&session).await.unwrap();
        assert_eq!(confirmed.summary.macros.calories, 300.0);
        assert_eq!(confirmed.summary.macros.carbs, 35.0);

        let logged = log_meal(&session, &day_log).await.unwrap();
        assert_eq!(logged.entry.name, FALLBACK_FOOD_NAME);
        assert_eq!(logged.entry.macros.fat, 8.0);
        assert_eq!(logged.totals.calories, 300.0);
        assert_eq!(logged.calories_remaining, 1700.0);
        assert!(!logged.goal_reached);
        assert_eq!(logged.entry_count, 1);

        // Committing closed the session
        let status = capture_status(&session).await;
        assert!(!status.open);

        let log = day_log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].name, FALLBACK_FOOD_NAME);
    }

    #[tokio::test]
    async fn test_only_one_session_at_a_time() {
        let session = Mutex::new(None);

        start_capture(&session).await.unwrap();
        let err = start_capture(&session).await.unwrap_err();
        assert!(err.contains("already open"));
    }

    #[tokio::test]
    async fn test_cancel_is_noop_when_closed() {
        let session = Mutex::new(None);

        let cancel = cancel_capture(&session).await;
        assert!(!cancel.was_open);

        start_capture(&session).await.unwrap();
        let cancel = cancel_capture(&session).await;
        assert!(cancel.was_open);
        assert!(!capture_status(&session).await.open);
    }

    #[tokio::test]
    async fn test_wrong_step_calls_fail() {
        let session = Mutex::new(None);
        let day_log = std::sync::Mutex::new(DayLog::new());

        start_capture(&session).await.unwrap();

        let err = set_portion(&session, 100.0).await.unwrap_err();
        assert!(err.contains("grams step"));

        let err = log_meal(&session, &day_log).await.unwrap_err();
        assert!(err.contains("summary step"));
        assert_eq!(day_log.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_go_back_walks_to_scan() {
        let session = Mutex::new(None);

        start_capture(&session).await.unwrap();
        use_demo_data(&session).await.unwrap();
        set_portion(&session, 80.0).await.unwrap();
        confirm_portion(&session).await.unwrap();

        let back = go_back(&session).await.unwrap();
        assert_eq!(back.step, Step::Grams);
        let status = capture_status(&session).await;
        assert_eq!(status.grams, Some(80.0));

        let back = go_back(&session).await.unwrap();
        assert_eq!(back.step, Step::Scan);
    }

    #[tokio::test]
    async fn test_ops_without_session_report_it() {
        let session = Mutex::new(None);
        let err = use_demo_data(&session).await.unwrap_err();
        assert_eq!(err, NO_SESSION);
    }
}
