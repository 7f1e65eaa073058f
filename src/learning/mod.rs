//! Per-user preference learning.
//!
//! Every inbound message feeds three things into the sender's profile:
//! repeated content words become topics, adjacent word pairs become
//! phrasing patterns, and lexical signals nudge the formality, verbosity
//! and technicality dials. Profiles live in memory and are never shared
//! between users.

pub mod learner;
pub mod lexicon;
pub mod profile;

pub use learner::{PreferenceLearner, PreferenceRules};
pub use lexicon::{candidate_tokens, extract_patterns, extract_topics, words_per_sentence};
pub use profile::{
    PatternCount, Preference, Preferences, ResponseContext, UserId, UserLearningProfile,
};
