//! adaptive-persona HTTP server binary.
//!
//! Wires the SQLite store, the configured generation backend and the engine
//! together and serves the chat routes.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `PERSONA_CONFIG` — YAML settings file (optional)
//! - `PERSONA_DB_PATH` — SQLite database path
//! - `PERSONA_BACKEND` — `gemini` (default) or `openrouter`
//! - `GOOGLE_API_KEY` — Gemini API key (replies fall back without it)
//! - `GOOGLE_API_URL` — Gemini endpoint override
//! - `OPENROUTER_API_KEY` — OpenRouter API key
//! - `OPENROUTER_MODEL` — OpenRouter model identifier
//! - `RUST_LOG` — Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! GOOGLE_API_KEY=... cargo run --bin server
//! ```

use std::sync::Arc;

use adaptive_persona::chat::ChatService;
use adaptive_persona::config::{BackendProvider, Settings};
use adaptive_persona::engine::PersonaEngine;
use adaptive_persona::llm::backend_from_settings;
use adaptive_persona::memory::{MemoryStore, SqliteMemoryStore};
use adaptive_persona::server::{app_router, AppState};
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,adaptive_persona=debug".into()),
        )
        .init();

    let settings = Settings::from_env().context("failed to load settings")?;
    let missing_key = match settings.backend.provider {
        BackendProvider::Gemini if settings.backend.api_key.is_none() => Some("GOOGLE_API_KEY"),
        BackendProvider::OpenRouter if settings.backend.openrouter.api_key.is_none() => {
            Some("OPENROUTER_API_KEY")
        }
        _ => None,
    };
    if let Some(var) = missing_key {
        tracing::warn!("{} not set; every reply will use the fallback text", var);
    }

    let store = Arc::new(
        SqliteMemoryStore::from_settings(&settings.memory).context("failed to open memory store")?,
    );
    match store.prune_older_than(settings.memory.retention_days).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(
            "pruned {} rows older than {} days",
            n,
            settings.memory.retention_days
        ),
        Err(e) => tracing::warn!("retention pruning failed: {}", e),
    }

    let backend = backend_from_settings(&settings.backend)?;
    let engine = PersonaEngine::new(&settings, backend)?.with_memory(store.clone());
    let state = AppState::new(ChatService::new(Arc::new(engine), store));

    let app = app_router(state);
    let bind_addr = format!("0.0.0.0:{}", settings.server.port);

    tracing::info!("adaptive-persona server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health            — liveness probe");
    tracing::info!("  POST /chat              — free-text message");
    tracing::info!("  POST /command           — slash command");
    tracing::info!("  GET  /personality       — mood and traits");
    tracing::info!("  GET  /users/:id/context — learned context");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server failed")?;

    Ok(())
}
