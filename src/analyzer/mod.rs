//! Nutrition label analysis
//!
//! One capability, several backends: hand a label photo to a vision model
//! and get per-100g macros back. Adapters share the prompt and the
//! response-text parsing; only the wire format differs per provider.

pub mod gemini;
pub mod groq;
pub mod image;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Macros;

pub use gemini::GeminiAnalyzer;
pub use groq::GroqAnalyzer;
pub use image::{ImageError, LabelImage};
pub use openai::OpenAiAnalyzer;

/// Prompt shared by every adapter. Kept blunt on purpose: vision models
/// love to wrap JSON in markdown fences unless told not to.
pub const LABEL_PROMPT: &str = "Analyze this nutrition label. Return a raw JSON object with these exact keys: calories, protein, carbs, fat. Values must be numbers. If the label shows 'per 100g', use those values. Do not include markdown formatting like ```json.";

/// Which vision API backs the analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Groq,
    OpenAi,
}

impl Provider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "groq" => Some(Provider::Groq),
            "openai" => Some(Provider::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::OpenAi => "openai",
        }
    }

    /// Label used in error messages and logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Groq => "Groq",
            Provider::OpenAi => "OpenAI",
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("API key is missing. Add your analyzer API key in settings.")]
    MissingCredential,
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        source: reqwest::Error,
    },
    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not read nutrition data from the {provider} response: {reason}")]
    Malformed {
        provider: &'static str,
        reason: String,
    },
}

/// Extracts per-100g macros from a nutrition label photo.
///
/// Implementations never panic on a bad response; every failure mode comes
/// back as an [`AnalyzerError`].
#[async_trait]
pub trait LabelAnalyzer: Send + Sync {
    fn provider(&self) -> Provider;

    async fn analyze(&self, image: &LabelImage, api_key: &str) -> Result<Macros, AnalyzerError>;
}

/// Build the adapter for the configured provider.
pub fn for_provider(provider: Provider) -> Box<dyn LabelAnalyzer> {
    match provider {
        Provider::Gemini => Box::new(GeminiAnalyzer::new()),
        Provider::Groq => Box::new(GroqAnalyzer::new()),
        Provider::OpenAi => Box::new(OpenAiAnalyzer::new()),
    }
}

/// Pull a macros object out of model reply text. Models sometimes wrap the
/// JSON in fences or prose despite the prompt, so this slices from the
/// first `{` to the last `}` before parsing. All four fields must be
/// present, numeric, and non-negative.
pub(crate) fn extract_macros(text: &str) -> Result<Macros, String> {
    let start = text.find('{').ok_or("no JSON object in reply text")?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or("no JSON object in reply text")?;

    let value: serde_json::Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| format!("reply is not valid JSON: {}", e))?;

    let field = |name: &str| -> Result<f64, String> {
        let n = value
            .get(name)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| format!("missing numeric field '{}'", name))?;
        if !n.is_finite() || n < 0.0 {
            return Err(format!("field '{}' is out of range", name));
        }
        Ok(n)
    };

    Ok(Macros {
        calories: field("calories")?,
        protein: field("protein")?,
        carbs: field("carbs")?,
        fat: field("fat")?,
    })
}

/// Reply text location for chat-completions style APIs (Groq, OpenAI).
pub(crate) fn chat_reply_text(payload: &serde_json::Value) -> Option<&str> {
    payload["choices"][0]["message"]["content"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let macros =
            extract_macros(r#"{"calories": 250, "protein": 12, "carbs": 30, "fat": 9}"#).unwrap();
        assert_eq!(macros.calories, 250.0);
        assert_eq!(macros.protein, 12.0);
        assert_eq!(macros.carbs, 30.0);
        assert_eq!(macros.fat, 9.0);
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "```json\n{\"calories\": 110.5, \"protein\": 4, \"carbs\": 22, \"fat\": 1}\n```";
        let macros = extract_macros(text).unwrap();
        assert_eq!(macros.calories, 110.5);
    }

    #[test]
    fn test_extract_json_inside_prose() {
        let text = "Here are the values you asked for: {\"calories\": 90, \"protein\": 2, \"carbs\": 18, \"fat\": 0} based on the label.";
        let macros = extract_macros(text).unwrap();
        assert_eq!(macros.fat, 0.0);
    }

    #[test]
    fn test_extract_rejects_missing_field() {
        let err = extract_macros(r#"{"calories": 250, "protein": 12, "carbs": 30}"#).unwrap_err();
        assert!(err.contains("fat"));
    }

    #[test]
    fn test_extract_rejects_non_numeric_field() {
        let err = extract_macros(
            r#"{"calories": "unknown", "protein": 12, "carbs": 30, "fat": 9}"#,
        )
        .unwrap_err();
        assert!(err.contains("calories"));
    }

    #[test]
    fn test_extract_rejects_negative_value() {
        let err =
            extract_macros(r#"{"calories": 250, "protein": -1, "carbs": 30, "fat": 9}"#)
                .unwrap_err();
        assert!(err.contains("protein"));
    }

    #[test]
    fn test_extract_rejects_text_without_json() {
        assert!(extract_macros("I could not read the label, sorry.").is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(Provider::from_str("gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str(" GROQ "), Some(Provider::Groq));
        assert_eq!(Provider::from_str("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_str("llava"), None);
        assert_eq!(Provider::default(), Provider::Gemini);
        assert_eq!(Provider::OpenAi.as_str(), "openai");
    }
}
