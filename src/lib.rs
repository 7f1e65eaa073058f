//! # adaptive-persona
//!
//! An adaptive personalization engine for a conversational agent. One
//! simulated personality (five traits and a timed mood) is shared across all
//! users, while each user gets a learned profile of topics, phrasing
//! patterns and style preferences. Replies from a text-generation backend
//! are decorated with the current mood and rewritten to match the user's
//! preferred register.
//!
//! The crate ships Gemini and OpenRouter backends, a SQLite memory store,
//! slash commands, and an axum HTTP server (`src/bin/server.rs`).

pub mod adapter;
pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod learning;
pub mod llm;
pub mod memory;
pub mod personality;
pub mod server;

pub use adapter::{Decoration, ResponseAdapter};
pub use chat::{ChatService, Command};
pub use config::Settings;
pub use engine::{EngineReply, PersonaEngine};
pub use error::{BackendError, ConfigError, StoreError};
pub use learning::{PreferenceLearner, Preferences, ResponseContext, UserId};
pub use llm::{backend_from_settings, GeminiBackend, GenerationBackend, OpenRouterBackend};
pub use memory::{MemoryGateway, MemoryStore, SqliteMemoryStore};
pub use personality::{EmotionalState, EmotionalStateMachine, Trait, TraitVector};

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
