//! Gemini adapter
//!
//! Talks to the generateContent endpoint. The image rides along as an
//! inline_data part next to the prompt text, and the generation config asks
//! for a JSON response outright.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{extract_macros, AnalyzerError, LabelAnalyzer, LabelImage, Provider, LABEL_PROMPT};
use crate::models::Macros;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiAnalyzer {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiAnalyzer {
    pub fn new() -> Self {
        Self::with_model(DEFAULT_MODEL)
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            model: model.to_string(),
        }
    }
}

impl Default for GeminiAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelAnalyzer for GeminiAnalyzer {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn analyze(&self, image: &LabelImage, api_key: &str) -> Result<Macros, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential);
        }

        let body = json!({
            "contents": [{
                "parts": [
                    {"text": LABEL_PROMPT},
                    {"inline_data": {
                        "mime_type": image.mime_type(),
                        "data": image.base64(),
                    }}
                ]
            }],
            "generationConfig": {
                "temperature": 0.1,
                "responseMimeType": "application/json",
            }
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| AnalyzerError::Transport {
                provider: "Gemini",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(AnalyzerError::Api {
                provider: "Gemini",
                status,
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|source| AnalyzerError::Transport {
                provider: "Gemini",
                source,
            })?;

        let text = reply_text(&payload).ok_or_else(|| AnalyzerError::Malformed {
            provider: "Gemini",
            reason: "no candidate text in response".to_string(),
        })?;

        extract_macros(text).map_err(|reason| AnalyzerError::Malformed {
            provider: "Gemini",
            reason,
        })
    }
}

/// Reply text lives at candidates[0].content.parts[0].text.
fn reply_text(payload: &Value) -> Option<&str> {
    payload["candidates"][0]["content"]["parts"][0]["text"].as_str()
}
