//! Google Gemini `generateContent` backend.
//!
//! Authenticates with the `key` query parameter. A single attempt per
//! call; failures surface as [`BackendError`] and the engine decides what
//! the user sees.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::GenerationBackend;
use crate::config::{BackendSettings, GenerationParams, SafetyConfig};
use crate::error::BackendError;

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    api_url: String,
    api_key: Option<String>,
    generation: GenerationParams,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            generation: settings.generation.clone(),
            client,
        })
    }

    /// Request body for a single-turn prompt.
    pub fn build_request_body(&self, prompt: &str, safety: &SafetyConfig) -> Value {
        json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "safetySettings": safety,
            "generationConfig": self.generation.to_json(),
        })
    }

    /// Extract `candidates[0].content.parts[0].text`.
    pub fn parse_response(response: &Value) -> Result<String, BackendError> {
        if let Some(error) = response.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown Gemini API error");
            return Err(BackendError::MalformedPayload(msg.to_string()));
        }

        let candidate = response
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| BackendError::MalformedPayload("no candidates in response".into()))?;

        candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .and_then(|p| p.first())
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| BackendError::MalformedPayload("no content.parts[0].text".into()))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, safety: &SafetyConfig) -> Result<String, BackendError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            BackendError::MissingApiKey("set GOOGLE_API_KEY".into())
        })?;

        log::debug!("gemini generate: {} prompt chars", prompt.chars().count());

        let response = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json")
            .query(&[("key", api_key)])
            .json(&self.build_request_body(prompt, safety))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            BackendError::MalformedPayload(format!("invalid JSON ({}): {}", e, preview))
        })?;
        Self::parse_response(&payload)
    }
}

// ============================================================================
// Tests
// ============================================================================
