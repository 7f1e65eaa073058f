//! Transport-facing chat service: commands, free text, and persistence
//! after the engine has replied.

use std::sync::Arc;

use super::commands::{Command, CommandHandler};
use crate::engine::{EngineReply, PersonaEngine};
use crate::learning::UserId;
use crate::memory::MemoryStore;

/// Reply used when a command could not reach the store.
pub const STORE_UNAVAILABLE: &str = "Sorry, I couldn't reach my memory just now. Please try again.";

#[derive(Clone)]
pub struct ChatService {
    engine: Arc<PersonaEngine>,
    store: Arc<dyn MemoryStore>,
    commands: CommandHandler,
}

impl ChatService {
    pub fn new(engine: Arc<PersonaEngine>, store: Arc<dyn MemoryStore>) -> Self {
        let commands = CommandHandler::new(engine.clone(), store.clone());
        Self {
            engine,
            store,
            commands,
        }
    }

    pub fn engine(&self) -> &Arc<PersonaEngine> {
        &self.engine
    }

    /// Reply to free text, then record the exchange and the learned snapshot.
    ///
    /// Store failures are logged; the reply is returned regardless.
    pub async fn handle_message(&self, user_id: UserId, text: &str) -> EngineReply {
        let reply = self.engine.respond(user_id, text).await;

        if let Err(e) = self.store.store_interaction(user_id, text, &reply.text).await {
            log::warn!("failed to record interaction for user {}: {}", user_id, e);
        }
        let snapshot = self.engine.response_context_for(user_id);
        if let Err(e) = self.store.store_preferences(user_id, &snapshot).await {
            log::warn!("failed to record preferences for user {}: {}", user_id, e);
        }

        reply
    }

    pub async fn handle_command(&self, user_id: UserId, command: Command) -> String {
        match self.commands.run(user_id, command).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("command failed for user {}: {}", user_id, e);
                STORE_UNAVAILABLE.to_string()
            }
        }
    }

    /// Dispatch `text` as a command when it starts with `/`, otherwise as chat.
    pub async fn handle_text(&self, user_id: UserId, text: &str) -> String {
        match Command::parse(text) {
            Some(command) => self.handle_command(user_id, command).await,
            None => self.handle_message(user_id, text).await.text,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
