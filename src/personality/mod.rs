//! Personality — traits, moods, and the sentiment signal that moves them.
//!
//! # Architecture
//!
//! ```text
//! TraitVector (5 bounded dimensions)
//!   ↓  weights
//! EmotionalStateMachine (7 moods, lazy timed expiry)
//!   ↑  compound score
//! SentimentScorer (injectable; lexicon by default)
//!   ↓  style_for(state)
//! ResponseStyle { expressions, modifiers } → reply decoration
//! ```
//!
//! One personality is shared by every user of an engine.

pub mod emotion;
pub mod sentiment;
pub mod state_machine;
pub mod traits;

pub use emotion::{
    style_for, EmotionalState, ResponseStyle, StateProfile, DECORATED_EXPRESSIONS, STATE_TABLE,
};
pub use sentiment::{LexiconSentimentScorer, SentimentScorer, StaticSentimentScorer};
pub use state_machine::{EmotionalStateMachine, PersonalitySummary, SignalOutcome, Transition};
pub use traits::{Trait, TraitVector};
