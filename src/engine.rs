//! The persona engine: one shared personality, per-user learning, and the
//! reply pipeline around a generation backend.
//!
//! Per message:
//!
//! ```text
//! learner.process ─► personality.adapt_to_signal ─► current_state
//!        │                                               │
//!        └──── topics ──► build_prompt ◄── memories ◄────┘
//!                            │
//!              backend.generate_for_user (no locks held)
//!                            │
//!          marker pass ─► preference pass ─► EngineReply
//! ```
//!
//! Shared state sits behind `parking_lot` mutexes that are only held for
//! synchronous sections. A per-user async lock keeps one user's messages in
//! order across the backend await while other users proceed.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::adapter::ResponseAdapter;
use crate::config::{SafetyConfig, Settings};
use crate::error::ConfigError;
use crate::learning::{PreferenceLearner, ResponseContext, UserId};
use crate::llm::{build_prompt, GenerationBackend};
use crate::memory::{InteractionRecord, MemoryGateway, MemoryRecord};
use crate::personality::{style_for, EmotionalState, EmotionalStateMachine, PersonalitySummary};

/// A finished reply and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineReply {
    pub text: String,
    pub emotional_state: EmotionalState,
    /// Adverb drawn for the mood; not part of `text`.
    pub modifier: Option<&'static str>,
    /// `true` when the backend failed and `text` is the apology.
    pub fell_back: bool,
}

/// Current mood with an expression drawn for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mood {
    pub state: EmotionalState,
    pub expression: &'static str,
}

/// Apology used when the backend fails. Still names the mood.
pub fn fallback_reply(state: EmotionalState) -> String {
    format!(
        "Sorry, I encountered an error. Please try again later. I was feeling {} too! 😅",
        state
    )
}

pub struct PersonaEngine {
    personality: Mutex<EmotionalStateMachine>,
    learner: Mutex<PreferenceLearner>,
    adapter: ResponseAdapter,
    backend: Arc<dyn GenerationBackend>,
    memory: Option<Arc<dyn MemoryGateway>>,
    safety: SafetyConfig,
    prompt_memory_limit: usize,
    importance_threshold: f64,
    conversations: DashMap<UserId, Arc<tokio::sync::Mutex<()>>>,
}

impl std::fmt::Debug for PersonaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonaEngine")
            .field("backend", &self.backend.name())
            .field("has_memory", &self.memory.is_some())
            .field("active_users", &self.conversations.len())
            .finish_non_exhaustive()
    }
}

impl PersonaEngine {
    pub fn new(
        settings: &Settings,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self, ConfigError> {
        Self::with_personality(
            settings,
            EmotionalStateMachine::new(&settings.personality),
            backend,
        )
    }

    /// Engine around an already-built state machine (seeded, scripted scorer).
    pub fn with_personality(
        settings: &Settings,
        personality: EmotionalStateMachine,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            personality: Mutex::new(personality),
            learner: Mutex::new(PreferenceLearner::new(&settings.learning)?),
            adapter: ResponseAdapter,
            backend,
            memory: None,
            safety: settings.backend.safety.clone(),
            prompt_memory_limit: settings.memory.prompt_memory_limit,
            importance_threshold: settings.memory.importance_threshold,
            conversations: DashMap::new(),
        })
    }

    /// Read memories from `gateway` when building prompts.
    pub fn with_memory(mut self, gateway: Arc<dyn MemoryGateway>) -> Self {
        self.memory = Some(gateway);
        self
    }

    fn conversation_lock(&self, user_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.conversations.entry(user_id).or_default().clone()
    }

    async fn prompt_memories(&self, user_id: UserId) -> Vec<MemoryRecord> {
        let Some(gateway) = &self.memory else {
            return Vec::new();
        };
        match gateway.recent_memories(user_id, self.prompt_memory_limit).await {
            Ok(memories) => memories
                .into_iter()
                .filter(|m| m.importance >= self.importance_threshold)
                .collect(),
            Err(e) => {
                log::warn!("memory lookup failed for user {}, continuing without: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Run one message through learning, mood, generation and adaptation.
    pub async fn respond(&self, user_id: UserId, text: &str) -> EngineReply {
        let conversation = self.conversation_lock(user_id);
        let _turn = conversation.lock().await;

        let context = self.learner.lock().process(user_id, text);
        let state = {
            let mut personality = self.personality.lock();
            personality.adapt_to_signal(text);
            personality.current_state()
        };

        let memories = self.prompt_memories(user_id).await;
        let prompt = build_prompt(state, &memories, &context.topics, text);

        match self
            .backend
            .generate_for_user(user_id, &prompt, &self.safety)
            .await
        {
            Ok(raw) => {
                let decoration = {
                    let mut personality = self.personality.lock();
                    self.adapter
                        .adapt(&raw, state, &context.preferences, personality.rng())
                };
                EngineReply {
                    text: decoration.text,
                    emotional_state: state,
                    modifier: decoration.modifier,
                    fell_back: false,
                }
            }
            Err(e) => {
                log::warn!("{} backend failed for user {}: {}", self.backend.name(), user_id, e);
                EngineReply {
                    text: fallback_reply(state),
                    emotional_state: state,
                    modifier: None,
                    fell_back: true,
                }
            }
        }
    }

    /// Reply text for one message.
    pub async fn process_message(&self, user_id: UserId, text: &str) -> String {
        self.respond(user_id, text).await.text
    }

    /// Feed a message to the learner without generating a reply.
    pub fn learn(&self, user_id: UserId, text: &str) -> ResponseContext {
        self.learner.lock().process(user_id, text)
    }

    /// Replay stored interactions through the learner and the personality.
    pub async fn sync_user(
        &self,
        user_id: UserId,
        interactions: &[InteractionRecord],
    ) -> EmotionalState {
        let conversation = self.conversation_lock(user_id);
        let _turn = conversation.lock().await;

        for interaction in interactions {
            self.learner.lock().process(user_id, &interaction.message);
            self.personality.lock().adapt_to_signal(&interaction.message);
        }
        log::debug!("replayed {} interactions for user {}", interactions.len(), user_id);
        self.current_state()
    }

    pub fn current_state(&self) -> EmotionalState {
        self.personality.lock().current_state()
    }

    /// Mood plus a randomly drawn expression for it.
    pub fn mood(&self) -> Mood {
        let mut personality = self.personality.lock();
        let state = personality.current_state();
        let expression = style_for(state)
            .expressions
            .choose(personality.rng())
            .copied()
            .unwrap_or_default();
        Mood { state, expression }
    }

    pub fn summary(&self) -> PersonalitySummary {
        let mut personality = self.personality.lock();
        personality.current_state();
        personality.summary()
    }

    pub fn response_context_for(&self, user_id: UserId) -> ResponseContext {
        self.learner.lock().response_context(user_id)
    }

    /// Forget everything learned about a user, including any conversation
    /// history the backend keeps.
    pub fn clear_user(&self, user_id: UserId) {
        self.learner.lock().clear(user_id);
        self.backend.forget_user(user_id);
    }
}

// ============================================================================
// Tests
// ============================================================================
