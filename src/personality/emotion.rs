//! Emotional states and their data table.
//!
//! Each state maps to an optional trait affinity (which scales how likely a
//! transition into it is) and a style bundle used to decorate replies. Adding
//! a state means adding a variant and a row in [`STATE_TABLE`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::traits::Trait;

/// The simulated mood of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalState {
    Happy,
    Excited,
    Calm,
    Thoughtful,
    Curious,
    Sympathetic,
    Neutral,
}

impl EmotionalState {
    pub const ALL: [EmotionalState; 7] = [
        EmotionalState::Happy,
        EmotionalState::Excited,
        EmotionalState::Calm,
        EmotionalState::Thoughtful,
        EmotionalState::Curious,
        EmotionalState::Sympathetic,
        EmotionalState::Neutral,
    ];

    /// Lowercase label used in prompts and user-facing text.
    pub fn label(self) -> &'static str {
        self.profile().label
    }

    /// Row of [`STATE_TABLE`] for this state.
    pub fn profile(self) -> &'static StateProfile {
        &STATE_TABLE[self as usize]
    }

    /// The trait that scales transitions into this state, if any.
    pub fn trait_affinity(self) -> Option<Trait> {
        self.profile().affinity
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Expressive symbols and adverbial modifiers for one state.
#[derive(Debug)]
pub struct ResponseStyle {
    pub expressions: &'static [&'static str],
    pub modifiers: &'static [&'static str],
}

#[derive(Debug)]
pub struct StateProfile {
    pub state: EmotionalState,
    pub label: &'static str,
    pub affinity: Option<Trait>,
    pub style: ResponseStyle,
}

/// Per-state data, indexed by `EmotionalState as usize`.
pub static STATE_TABLE: [StateProfile; 7] = [
    StateProfile {
        state: EmotionalState::Happy,
        label: "happy",
        affinity: Some(Trait::Extraversion),
        style: ResponseStyle {
            expressions: &["😊", "🌟", "✨", "😄"],
            modifiers: &["enthusiastically", "cheerfully", "gladly"],
        },
    },
    StateProfile {
        state: EmotionalState::Excited,
        label: "excited",
        affinity: None,
        style: ResponseStyle {
            expressions: &["🎉", "⚡", "🚀", "✨"],
            modifiers: &["excitedly", "energetically", "passionately"],
        },
    },
    StateProfile {
        state: EmotionalState::Calm,
        label: "calm",
        affinity: None,
        style: ResponseStyle {
            expressions: &["😌", "🌸", "🍃", "💫"],
            modifiers: &["calmly", "peacefully", "serenely"],
        },
    },
    StateProfile {
        state: EmotionalState::Thoughtful,
        label: "thoughtful",
        affinity: Some(Trait::Conscientiousness),
        style: ResponseStyle {
            expressions: &["🤔", "💭", "📚", "🎯"],
            modifiers: &["thoughtfully", "carefully", "considerately"],
        },
    },
    StateProfile {
        state: EmotionalState::Curious,
        label: "curious",
        affinity: Some(Trait::Openness),
        style: ResponseStyle {
            expressions: &["🧐", "🔍", "💡", "❓"],
            modifiers: &["curiously", "inquisitively", "with interest"],
        },
    },
    StateProfile {
        state: EmotionalState::Sympathetic,
        label: "sympathetic",
        affinity: Some(Trait::Empathy),
        style: ResponseStyle {
            expressions: &["💝", "🤗", "💞", "💫"],
            modifiers: &["sympathetically", "caringly", "warmly"],
        },
    },
    StateProfile {
        state: EmotionalState::Neutral,
        label: "neutral",
        affinity: None,
        style: ResponseStyle {
            expressions: &["👍", "✨", "💫", "📝"],
            modifiers: &["clearly", "precisely", "effectively"],
        },
    },
];

/// Symbols that mark a reply as already decorated.
pub const DECORATED_EXPRESSIONS: &[&str] = &["😊", "🌟", "✨", "😄", "🎉", "⚡", "🚀"];

/// Style bundle for a state.
pub fn style_for(state: EmotionalState) -> &'static ResponseStyle {
    &state.profile().style
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_variant() {
        for state in EmotionalState::ALL {
            assert_eq!(state.profile().state, state);
        }
    }

    #[test]
    fn test_trait_affinities() {
        assert_eq!(EmotionalState::Happy.trait_affinity(), Some(Trait::Extraversion));
        assert_eq!(
            EmotionalState::Thoughtful.trait_affinity(),
            Some(Trait::Conscientiousness)
        );
        assert_eq!(EmotionalState::Curious.trait_affinity(), Some(Trait::Openness));
        assert_eq!(EmotionalState::Sympathetic.trait_affinity(), Some(Trait::Empathy));
        assert_eq!(EmotionalState::Calm.trait_affinity(), None);
        assert_eq!(EmotionalState::Excited.trait_affinity(), None);
        assert_eq!(EmotionalState::Neutral.trait_affinity(), None);
    }

    #[test]
    fn test_every_style_is_populated() {
        for state in EmotionalState::ALL {
            let style = style_for(state);
            assert!(!style.expressions.is_empty(), "{} has no expressions", state);
            assert!(!style.modifiers.is_empty(), "{} has no modifiers", state);
        }
    }

    #[test]
    fn test_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&EmotionalState::Sympathetic).unwrap();
        assert_eq!(json, "\"sympathetic\"");
        assert_eq!(EmotionalState::Sympathetic.to_string(), "sympathetic");
    }
}
