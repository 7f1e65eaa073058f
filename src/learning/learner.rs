//! Per-user preference learner.

use std::collections::HashMap;

use super::lexicon::{extract_patterns, extract_topics, words_per_sentence, LexiconMatcher};
use super::profile::{Preference, Preferences, ResponseContext, UserId, UserLearningProfile};
use crate::config::LearningSettings;
use crate::error::ConfigError;

/// Lexical heuristics that move the preference dials.
#[derive(Debug, Clone)]
pub struct PreferenceRules {
    formal: LexiconMatcher,
    casual: LexiconMatcher,
    technical: LexiconMatcher,
    step: f32,
    concise_below: f32,
    verbose_above: f32,
}

impl PreferenceRules {
    pub fn new(settings: &LearningSettings) -> Result<Self, ConfigError> {
        let matcher = |words: &[String], name: &str| {
            LexiconMatcher::new(words)
                .map_err(|e| ConfigError::Validation(format!("{} lexicon: {}", name, e)))
        };
        Ok(Self {
            formal: matcher(&settings.formal_indicators, "formal")?,
            casual: matcher(&settings.casual_indicators, "casual")?,
            technical: matcher(&settings.technical_keywords, "technical")?,
            step: settings.preference_adjustment_rate,
            concise_below: settings.concise_words_per_sentence,
            verbose_above: settings.verbose_words_per_sentence,
        })
    }

    pub fn apply(&self, text: &str, prefs: &mut Preferences) {
        let formal = self.formal.count(text);
        let casual = self.casual.count(text);
        if formal > casual {
            prefs.nudge(Preference::Formality, self.step);
        } else if casual > formal {
            prefs.nudge(Preference::Formality, -self.step);
        }

        let density = words_per_sentence(text);
        if density > self.verbose_above {
            prefs.nudge(Preference::Verbosity, self.step);
        } else if density < self.concise_below {
            prefs.nudge(Preference::Verbosity, -self.step);
        }

        if self.technical.count(text) > 0 {
            prefs.nudge(Preference::Technicality, self.step);
        }
    }
}

/// Learns topics, phrasing patterns and style preferences per user.
#[derive(Debug)]
pub struct PreferenceLearner {
    rules: PreferenceRules,
    max_topics: usize,
    max_patterns: usize,
    profiles: HashMap<UserId, UserLearningProfile>,
}

impl PreferenceLearner {
    pub fn new(settings: &LearningSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: PreferenceRules::new(settings)?,
            max_topics: settings.max_topics,
            max_patterns: settings.max_patterns,
            profiles: HashMap::new(),
        })
    }

    /// Nudge `prefs` from the lexical signals in `text`.
    pub fn update_preferences(&self, text: &str, prefs: &mut Preferences) {
        self.rules.apply(text, prefs);
    }

    /// Fold one message into the user's profile and return the updated context.
    pub fn process(&mut self, user_id: UserId, text: &str) -> ResponseContext {
        let profile = self.profiles.entry(user_id).or_insert_with(|| {
            log::debug!("creating learning profile for user {}", user_id);
            UserLearningProfile::default()
        });

        let topics = extract_topics(text);
        profile.remember_topics(&topics, self.max_topics);
        profile.record_patterns(&extract_patterns(text));
        self.rules.apply(text, profile.preferences_mut());
        profile.count_message();

        log::debug!(
            "user {} message #{}: topics {:?}, preferences {:?}",
            user_id,
            profile.message_count(),
            topics,
            profile.preferences()
        );

        profile.context(self.max_patterns)
    }

    /// Current context for a user; defaults when the user is unknown.
    pub fn response_context(&self, user_id: UserId) -> ResponseContext {
        self.profiles
            .get(&user_id)
            .map(|p| p.context(self.max_patterns))
            .unwrap_or_default()
    }

    /// Reset a user's profile to defaults. Unknown users are ignored.
    pub fn clear(&mut self, user_id: UserId) {
        if let Some(profile) = self.profiles.get_mut(&user_id) {
            *profile = UserLearningProfile::default();
            log::debug!("cleared learning profile for user {}", user_id);
        }
    }

    pub fn profile(&self, user_id: UserId) -> Option<&UserLearningProfile> {
        self.profiles.get(&user_id)
    }

    pub fn user_count(&self) -> usize {
        self.profiles.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
