//! Text-generation backends and prompt assembly.
//!
//! The engine talks to a [`GenerationBackend`] only through
//! `generate_for_user`, and never holds a lock across the call.

pub mod gemini;
pub mod openrouter;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendProvider, BackendSettings, SafetyConfig};
use crate::error::BackendError;
use crate::learning::UserId;

pub use gemini::GeminiBackend;
pub use openrouter::{ChatMessage, ChatRole, OpenRouterBackend};
pub use prompt::build_prompt;

/// An external service that turns a prompt into reply text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, safety: &SafetyConfig) -> Result<String, BackendError>;

    /// Generate on behalf of one user. Backends that keep per-user
    /// conversation history override this; stateless ones delegate to
    /// [`generate`](Self::generate).
    async fn generate_for_user(
        &self,
        _user_id: UserId,
        prompt: &str,
        safety: &SafetyConfig,
    ) -> Result<String, BackendError> {
        self.generate(prompt, safety).await
    }

    /// Drop any per-user state the backend holds.
    fn forget_user(&self, _user_id: UserId) {}
}

/// Build the backend selected by `settings.provider`.
pub fn backend_from_settings(
    settings: &BackendSettings,
) -> Result<Arc<dyn GenerationBackend>, BackendError> {
    let backend: Arc<dyn GenerationBackend> = match settings.provider {
        BackendProvider::Gemini => Arc::new(GeminiBackend::new(settings)?),
        BackendProvider::OpenRouter => Arc::new(OpenRouterBackend::new(settings)?),
    };
    log::info!("generation backend: {}", backend.name());
    Ok(backend)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_settings_follows_provider() {
        let mut settings = BackendSettings::default();
        assert_eq!(backend_from_settings(&settings).unwrap().name(), "gemini");

        settings.provider = BackendProvider::OpenRouter;
        assert_eq!(backend_from_settings(&settings).unwrap().name(), "openrouter");
    }
}
