//! Slash commands and their replies.

use std::fmt::Write;
use std::sync::Arc;

use crate::engine::PersonaEngine;
use crate::error::StoreError;
use crate::learning::{ResponseContext, UserId};
use crate::memory::{MemoryStore, USER_NOTE};
use crate::personality::{PersonalitySummary, Trait};

/// Interactions read for `/stats` and `/sync`.
pub const RECENT_INTERACTION_LIMIT: usize = 10;
/// User notes listed by a bare `/forget`.
pub const FORGET_LISTING_LIMIT: usize = 5;
/// Width of a trait bar in cells.
const BAR_WIDTH: usize = 10;

pub const HELP_TEXT: &str = "Available commands:

Basic Commands:
/start - Start the conversation
/help - Show this help message
/clear - Clear conversation history

Personality & Learning:
/personality - View my personality traits
/mood - Check my current emotional state
/remember <text> - Store important information
/forget <id> - Remove stored information
/stats - View interaction statistics
/sync - Update my learning preferences

You can:
- Have natural conversations
- Share your views and opinions
- Ask questions
- Watch me learn and adapt to your style!

Just start chatting! 😊";

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Clear,
    Personality,
    Mood,
    /// Text to remember; may be empty.
    Remember(String),
    /// Raw memory id argument, if one was given.
    Forget(Option<String>),
    Stats,
    Sync,
    Unknown(String),
}

impl Command {
    /// Parse `text` as a command. `None` when it doesn't start with `/`.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (word, args) = match rest.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (rest, ""),
        };
        let name = word.split('@').next().unwrap_or(word).to_lowercase();

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "clear" => Command::Clear,
            "personality" => Command::Personality,
            "mood" => Command::Mood,
            "remember" => Command::Remember(args.to_string()),
            "forget" => Command::Forget(args.split_whitespace().next().map(str::to_string)),
            "stats" => Command::Stats,
            "sync" => Command::Sync,
            _ => Command::Unknown(name),
        };
        Some(command)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// `█` per tenth of `value`, padded with spaces to ten cells.
pub fn trait_bar(value: f32) -> String {
    let filled = ((value * 10.0).floor().max(0.0) as usize).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}

pub fn render_personality(summary: &PersonalitySummary) -> String {
    let mut out = format!(
        "Current Personality State:\n\nEmotional State: {}\n\nTraits:\n",
        summary.emotional_state
    );
    for t in Trait::ALL {
        if let Some(value) = summary.traits.get(t.as_str()) {
            let _ = writeln!(out, "- {}: {} ({:.1})", t, trait_bar(*value), value);
        }
    }
    out
}

pub fn render_stats(context: &ResponseContext, recent_interactions: usize) -> String {
    let mut out = String::from("Interaction Statistics:\n\nTop Topics of Interest:\n");
    for topic in &context.topics {
        let _ = writeln!(out, "- {}", topic);
    }
    out.push_str("\nCommon Interaction Patterns:\n");
    for pattern in &context.patterns {
        let _ = writeln!(out, "- {}: {} times", pattern.pattern, pattern.count);
    }
    let _ = write!(out, "\nRecent Interactions: {}", recent_interactions);
    out
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Runs commands against the engine and the store.
#[derive(Clone)]
pub struct CommandHandler {
    engine: Arc<PersonaEngine>,
    store: Arc<dyn MemoryStore>,
}

impl CommandHandler {
    pub fn new(engine: Arc<PersonaEngine>, store: Arc<dyn MemoryStore>) -> Self {
        Self { engine, store }
    }

    pub async fn run(&self, user_id: UserId, command: Command) -> Result<String, StoreError> {
        log::debug!("user {} ran {:?}", user_id, command);
        match command {
            Command::Start => Ok(format!(
                "Hello! 😊 I'm your AI assistant with personality and learning capabilities.\n\n\
                 I can learn from our conversations and adapt to your preferences. \
                 Currently feeling {}!",
                self.engine.current_state()
            )),
            Command::Help => Ok(HELP_TEXT.to_string()),
            Command::Clear => {
                self.store.clear_user(user_id).await?;
                self.engine.clear_user(user_id);
                Ok("Memory cleared! Let's start fresh. 🌟".to_string())
            }
            Command::Personality => Ok(render_personality(&self.engine.summary())),
            Command::Mood => {
                let mood = self.engine.mood();
                Ok(format!(
                    "Current Mood: {}\n{}\n\nI'm feeling quite {} right now!",
                    mood.state, mood.expression, mood.state
                ))
            }
            Command::Remember(content) => self.remember(user_id, &content).await,
            Command::Forget(arg) => self.forget(user_id, arg.as_deref()).await,
            Command::Stats => {
                let recent = self
                    .store
                    .recent_interactions(user_id, RECENT_INTERACTION_LIMIT)
                    .await?;
                Ok(render_stats(&self.engine.response_context_for(user_id), recent.len()))
            }
            Command::Sync => {
                let mut recent = self
                    .store
                    .recent_interactions(user_id, RECENT_INTERACTION_LIMIT)
                    .await?;
                recent.reverse();
                let state = self.engine.sync_user(user_id, &recent).await;
                self.store
                    .store_preferences(user_id, &self.engine.response_context_for(user_id))
                    .await?;
                Ok(format!(
                    "Synchronized! 🔄\n\n\
                     I've updated my understanding based on our recent interactions.\n\
                     Current mood: {}",
                    state
                ))
            }
            Command::Unknown(name) => Ok(format!("Unknown command: /{}. Try /help.", name)),
        }
    }

    async fn remember(&self, user_id: UserId, content: &str) -> Result<String, StoreError> {
        if content.is_empty() {
            return Ok("Please specify what to remember: /remember <your text>".to_string());
        }
        self.store.store_memory(user_id, content, USER_NOTE, 1.0).await?;
        self.engine.learn(user_id, content);
        Ok(format!("I'll remember that! 📝\n\nStored: {}", content))
    }

    async fn forget(&self, user_id: UserId, arg: Option<&str>) -> Result<String, StoreError> {
        let Some(raw) = arg else {
            let memories = self
                .store
                .memories_of_kind(user_id, USER_NOTE, FORGET_LISTING_LIMIT)
                .await?;
            if memories.is_empty() {
                return Ok("No memories stored yet!".to_string());
            }
            let mut out = String::from("Recent memories:\n\n");
            for memory in &memories {
                let _ = writeln!(out, "{}: {}", memory.id, memory.content);
            }
            out.push_str("\nTo forget a specific memory, use: /forget <memory_id>");
            return Ok(out);
        };

        let Ok(memory_id) = raw.parse::<i64>() else {
            return Ok("Please provide a valid memory ID.".to_string());
        };
        if self.store.delete_memory(user_id, memory_id).await? {
            Ok("Memory forgotten! 🗑️".to_string())
        } else {
            Ok("Memory not found or already forgotten.".to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
