//! Prompt assembly: a system context block followed by the raw user message.

use std::fmt::Write;

use crate::memory::MemoryRecord;
use crate::personality::EmotionalState;

const PREAMBLE: &str = "You are an AI assistant with personality and learning capabilities.";

/// Build the prompt sent to the backend.
///
/// The context names the current mood, lists the given memories, and the
/// user's topics when there are any. Callers limit `memories` beforehand.
pub fn build_prompt(
    state: EmotionalState,
    memories: &[MemoryRecord],
    topics: &[String],
    message: &str,
) -> String {
    let mut prompt = format!(
        "{} Your current emotional state is {}. ",
        PREAMBLE,
        state.label()
    );

    if !memories.is_empty() {
        prompt.push_str("\nRelevant context from past interactions:\n");
        for memory in memories {
            let _ = writeln!(prompt, "- {}", memory.content);
        }
    }

    if !topics.is_empty() {
        let _ = write!(prompt, "\nUser's topics of interest: {}", topics.join(", "));
    }

    let _ = write!(prompt, "\n\nUser message: {}", message);
    prompt
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn memory(content: &str) -> MemoryRecord {
        MemoryRecord {
            id: 1,
            user_id: 1,
            content: content.into(),
            kind: "user_note".into(),
            importance: 1.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_minimal_prompt() {
        let prompt = build_prompt(EmotionalState::Calm, &[], &[], "hello");
        assert_eq!(
            prompt,
            "You are an AI assistant with personality and learning capabilities. \
             Your current emotional state is calm. \n\nUser message: hello"
        );
    }

    #[test]
    fn test_prompt_with_memories_and_topics() {
        let memories = vec![memory("likes rust"), memory("lives in Oslo")];
        let topics = vec!["rust".to_string(), "tokio".to_string()];
        let prompt = build_prompt(EmotionalState::Curious, &memories, &topics, "what next?");

        assert!(prompt.contains("emotional state is curious"));
        assert!(prompt.contains(
            "Relevant context from past interactions:\n- likes rust\n- lives in Oslo\n"
        ));
        assert!(prompt.contains("User's topics of interest: rust, tokio"));
        assert!(prompt.ends_with("\n\nUser message: what next?"));
    }
}
