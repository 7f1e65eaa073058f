//! OpenRouter chat-completions backend.
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol with a Bearer
//! token. Each user has a bounded conversation history that is replayed
//! with every request; an exchange is recorded only after a successful
//! reply.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::GenerationBackend;
use crate::config::{BackendSettings, OpenRouterSettings, SafetyConfig};
use crate::error::BackendError;
use crate::learning::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation as sent in `messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

/// OpenRouter REST client with per-user history.
#[derive(Debug)]
pub struct OpenRouterBackend {
    settings: OpenRouterSettings,
    client: reqwest::Client,
    histories: DashMap<UserId, VecDeque<ChatMessage>>,
}

impl OpenRouterBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            settings: settings.openrouter.clone(),
            client,
            histories: DashMap::new(),
        })
    }

    /// Messages kept per user: one user and one assistant turn per exchange.
    fn history_cap(&self) -> usize {
        self.settings.max_conversation_length * 2
    }

    /// Snapshot of a user's history, oldest first.
    pub fn history(&self, user_id: UserId) -> Vec<ChatMessage> {
        self.histories
            .get(&user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// History plus the new prompt as the final user turn.
    fn messages_for(&self, user_id: UserId, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = self.history(user_id);
        messages.push(ChatMessage::new(ChatRole::User, prompt));
        messages
    }

    fn record_exchange(&self, user_id: UserId, prompt: &str, reply: &str) {
        let cap = self.history_cap();
        if cap == 0 {
            return;
        }
        let mut history = self.histories.entry(user_id).or_default();
        history.push_back(ChatMessage::new(ChatRole::User, prompt));
        history.push_back(ChatMessage::new(ChatRole::Assistant, reply));
        while history.len() > cap {
            history.pop_front();
        }
    }

    pub fn build_request_body(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "top_p": self.settings.top_p,
            "frequency_penalty": 0,
            "presence_penalty": 0,
            "stream": false,
        })
    }

    /// Extract `choices[0].message.content`, trimmed.
    pub fn parse_response(response: &Value) -> Result<String, BackendError> {
        if let Some(error) = response.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown OpenRouter API error");
            return Err(BackendError::MalformedPayload(msg.to_string()));
        }

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "openrouter token usage: prompt={}, completion={}",
                usage.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
            );
        }

        let content = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::trim)
            .ok_or_else(|| BackendError::MalformedPayload("no choices[0].message.content".into()))?;

        if content.is_empty() {
            return Err(BackendError::MalformedPayload("empty completion".into()));
        }
        Ok(content.to_string())
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            BackendError::MissingApiKey("set OPENROUTER_API_KEY".into())
        })?;

        log::debug!(
            "openrouter generate: model={}, {} messages",
            self.settings.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.build_request_body(messages))
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

#[async_trait]
impl GenerationBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    /// Single-turn completion with no history. OpenRouter takes no safety
    /// settings, so `_safety` is unused.
    async fn generate(&self, prompt: &str, _safety: &SafetyConfig) -> Result<String, BackendError> {
        self.complete(&[ChatMessage::new(ChatRole::User, prompt)]).await
    }

    async fn generate_for_user(
        &self,
        user_id: UserId,
        prompt: &str,
        _safety: &SafetyConfig,
    ) -> Result<String, BackendError> {
        let messages = self.messages_for(user_id, prompt);
        let reply = self.complete(&messages).await?;
        self.record_exchange(user_id, prompt, &reply);
        Ok(reply)
    }

    fn forget_user(&self, user_id: UserId) {
        self.histories.remove(&user_id);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with(max_conversation_length: usize) -> OpenRouterBackend {
        let mut settings = BackendSettings::default();
        settings.openrouter.max_conversation_length = max_conversation_length;
        OpenRouterBackend::new(&settings).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let backend = backend_with(10);
        let body = backend.build_request_body(&backend.messages_for(1, "hello"));
        assert_eq!(body["model"], "google/gemma-3-12b-it:free");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["top_p"], 0.95);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_first_choice_trimmed() {
        let payload = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  first \n" } },
                { "message": { "role": "assistant", "content": "second" } }
            ],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        });
        assert_eq!(OpenRouterBackend::parse_response(&payload).unwrap(), "first");
    }

    #[test]
    fn test_parse_rejects_missing_or_error() {
        for payload in [
            json!({}),
            json!({ "choices": [] }),
            json!({ "choices": [{ "message": { "content": "   " } }] }),
            json!({ "error": { "message": "rate limited", "code": 429 } }),
        ] {
            assert!(matches!(
                OpenRouterBackend::parse_response(&payload),
                Err(BackendError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn test_history_is_bounded_per_user() {
        let backend = backend_with(2);
        for i in 0..3 {
            backend.record_exchange(1, &format!("q{i}"), &format!("a{i}"));
        }
        backend.record_exchange(2, "other", "reply");

        let contents: Vec<String> = backend.history(1).into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(backend.history(2).len(), 2);

        let messages = backend.messages_for(1, "q3");
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[4], ChatMessage::new(ChatRole::User, "q3"));
    }

    #[test]
    fn test_zero_length_keeps_no_history() {
        let backend = backend_with(0);
        backend.record_exchange(1, "q", "a");
        assert!(backend.history(1).is_empty());
    }

    #[test]
    fn test_forget_user_drops_history() {
        let backend = backend_with(10);
        backend.record_exchange(1, "q", "a");
        backend.record_exchange(2, "q", "a");
        backend.forget_user(1);
        assert!(backend.history(1).is_empty());
        assert_eq!(backend.history(2).len(), 2);
    }

    #[tokio::test]
    async fn test_failed_request_leaves_history_untouched() {
        let backend = backend_with(10);
        let err = backend
            .generate_for_user(1, "hi", &SafetyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey(_)));
        assert!(backend.history(1).is_empty());
    }
}
