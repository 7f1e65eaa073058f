//! Axum route handlers.
//!
//! # Routes
//!
//! - `GET  /health`             — Returns `{"status": "ok", "version": ...}`
//! - `POST /chat`               — `{user_id, message}` → engine reply
//! - `POST /command`            — `{user_id, text}` → command reply
//! - `GET  /personality`        — Current mood and trait values
//! - `GET  /users/:id/context`  — Learned context for one user

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::chat::{ChatService, Command};
use crate::engine::EngineReply;
use crate::learning::{ResponseContext, UserId};
use crate::personality::PersonalitySummary;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub user_id: UserId,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandRequest {
    pub user_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandResponse {
    pub reply: String,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/command", post(command_handler))
        .route("/personality", get(personality_handler))
        .route("/users/:id/context", get(context_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "adaptive-persona",
    }))
}

/// POST /chat — free-text message through the engine.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<EngineReply> {
    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4(), user_id = request.user_id);
    async move {
        let reply = state
            .chat
            .handle_message(request.user_id, &request.message)
            .await;
        tracing::info!(
            emotional_state = %reply.emotional_state,
            fell_back = reply.fell_back,
            "reply ready"
        );
        Json(reply)
    }
    .instrument(span)
    .await
}

/// POST /command — slash command.
async fn command_handler(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<Value>)> {
    let span = tracing::info_span!(
        "command",
        request_id = %Uuid::new_v4(),
        user_id = request.user_id
    );
    async move {
        let Some(command) = Command::parse(&request.text) else {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("Not a command: '{}' (commands start with '/')", request.text),
                })),
            ));
        };
        tracing::info!(?command, "running command");
        let reply = state.chat.handle_command(request.user_id, command).await;
        Ok(Json(CommandResponse { reply }))
    }
    .instrument(span)
    .await
}

/// GET /personality — mood and traits.
async fn personality_handler(State(state): State<AppState>) -> Json<PersonalitySummary> {
    Json(state.chat.engine().summary())
}

/// GET /users/:id/context — learned topics, patterns and preferences.
async fn context_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Json<ResponseContext> {
    Json(state.chat.engine().response_context_for(user_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tower::ServiceExt;

    use crate::config::{SafetyConfig, Settings};
    use crate::engine::PersonaEngine;
    use crate::error::BackendError;
    use crate::llm::GenerationBackend;
    use crate::memory::InMemoryStore;
    use crate::personality::{EmotionalState, EmotionalStateMachine, StaticSentimentScorer};

    struct FixedBackend;

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _safety: &SafetyConfig,
        ) -> Result<String, BackendError> {
            Ok("Happy to help.".to_string())
        }
    }

    fn test_state() -> AppState {
        let settings = Settings::default();
        let personality = EmotionalStateMachine::with_parts(
            &settings.personality,
            Box::new(StdRng::seed_from_u64(4)),
            Box::new(StaticSentimentScorer(0.0)),
        );
        let engine = PersonaEngine::with_personality(&settings, personality, Arc::new(FixedBackend))
            .unwrap();
        let store = Arc::new(InMemoryStore::default());
        AppState::new(ChatService::new(Arc::new(engine), store))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = app_router(test_state());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_chat_endpoint_returns_decorated_reply() {
        let app = app_router(test_state());
        let response = app
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_id": 42, "message": "hello there"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert!(json["text"].as_str().unwrap().ends_with("Happy to help."));
        assert_eq!(json["emotional_state"], "neutral");
        assert_eq!(json["fell_back"], false);
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let app = app_router(test_state());
        let response = app
            .oneshot(post_json("/chat", serde_json::json!({"message": "no user"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_command_endpoint() {
        let app = app_router(test_state());
        let response = app
            .oneshot(post_json(
                "/command",
                serde_json::json!({"user_id": 1, "text": "/mood"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["reply"].as_str().unwrap().starts_with("Current Mood: neutral"));
    }

    #[tokio::test]
    async fn test_command_endpoint_rejects_plain_text() {
        let app = app_router(test_state());
        let response = app
            .oneshot(post_json(
                "/command",
                serde_json::json!({"user_id": 1, "text": "mood"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Not a command"));
    }

    #[tokio::test]
    async fn test_personality_endpoint() {
        let app = app_router(test_state());
        let request = Request::builder()
            .uri("/personality")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let summary: PersonalitySummary =
            serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(summary.emotional_state, EmotionalState::Neutral);
        assert_eq!(summary.traits.len(), 5);
    }

    #[tokio::test]
    async fn test_context_endpoint_reflects_learning() {
        let state = test_state();
        state.chat.handle_message(9, "please kindly review the api").await;

        let app = app_router(state);
        let request = Request::builder()
            .uri("/users/9/context")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let context: ResponseContext = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(context.message_count, 1);
        assert!(context.preferences.formality > 0.5);
        assert!(context.preferences.technicality > 0.5);
    }

    #[tokio::test]
    async fn test_context_endpoint_unknown_user_defaults() {
        let app = app_router(test_state());
        let request = Request::builder()
            .uri("/users/1234/context")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let context: ResponseContext = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(context, ResponseContext::default());
    }
}
