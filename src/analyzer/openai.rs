//! OpenAI adapter
//!
//! Same chat-completions shape as Groq, pointed at api.openai.com with a
//! vision-capable GPT model.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    chat_reply_text, extract_macros, AnalyzerError, LabelAnalyzer, LabelImage, Provider,
    LABEL_PROMPT,
};
use crate::models::Macros;

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiAnalyzer {
    client: Client,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new() -> Self {
        Self::with_model(DEFAULT_MODEL)
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            client: Client::new(),
            model: model.to_string(),
        }
    }
}

impl Default for OpenAiAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelAnalyzer for OpenAiAnalyzer {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn analyze(&self, image: &LabelImage, api_key: &str) -> Result<Macros, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential);
        }

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": LABEL_PROMPT},
                    {"type": "image_url", "image_url": {"url": image.data_url()}}
                ]
            }],
            "temperature": 0.1,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(CHAT_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| AnalyzerError::Transport {
                provider: "OpenAI",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(AnalyzerError::Api {
                provider: "OpenAI",
                status,
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|source| AnalyzerError::Transport {
                provider: "OpenAI",
                source,
            })?;

        let text = chat_reply_text(&payload).ok_or_else(|| AnalyzerError::Malformed {
            provider: "OpenAI",
            reason: "no message content in response".to_string(),
        })?;

        extract_macros(text).map_err(|reason| AnalyzerError::Malformed {
            provider: "OpenAI",
            reason,
        })
    }
}
