//! Per-user learning state.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat-transport user identifier.
pub type UserId = i64;

/// One of the three preference dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Formality,
    Verbosity,
    Technicality,
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preference::Formality => "formality",
            Preference::Verbosity => "verbosity",
            Preference::Technicality => "technicality",
        })
    }
}

/// Inferred stylistic preferences, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub formality: f32,
    pub verbosity: f32,
    pub technicality: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            formality: 0.5,
            verbosity: 0.5,
            technicality: 0.5,
        }
    }
}

impl Preferences {
    pub fn get(&self, pref: Preference) -> f32 {
        match pref {
            Preference::Formality => self.formality,
            Preference::Verbosity => self.verbosity,
            Preference::Technicality => self.technicality,
        }
    }

    /// Move one dial by `delta`, clamped to `[0, 1]`.
    pub fn nudge(&mut self, pref: Preference, delta: f32) -> f32 {
        let slot = match pref {
            Preference::Formality => &mut self.formality,
            Preference::Verbosity => &mut self.verbosity,
            Preference::Technicality => &mut self.technicality,
        };
        if delta.is_finite() {
            *slot = (*slot + delta).clamp(0.0, 1.0);
        }
        debug_assert!((0.0..=1.0).contains(slot), "{} out of range: {}", pref, slot);
        *slot
    }
}

/// A two-token sequence and how often the user has produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PatternStat {
    count: u64,
    first_seen: u64,
}

/// Everything learned about one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLearningProfile {
    topics: VecDeque<String>,
    patterns: HashMap<String, PatternStat>,
    preferences: Preferences,
    message_count: u64,
    next_seq: u64,
}

impl UserLearningProfile {
    /// Topics from oldest to most recently seen.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn pattern_count(&self, pattern: &str) -> u64 {
        self.patterns.get(pattern).map_or(0, |s| s.count)
    }

    /// Number of distinct patterns ever recorded.
    pub fn distinct_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Append topics, moving re-seen ones to the end, then drop the oldest
    /// beyond `capacity`.
    pub fn remember_topics(&mut self, topics: &[String], capacity: usize) {
        for topic in topics {
            if let Some(pos) = self.topics.iter().position(|t| t == topic) {
                self.topics.remove(pos);
            }
            self.topics.push_back(topic.clone());
        }
        while self.topics.len() > capacity {
            self.topics.pop_front();
        }
    }

    pub fn record_patterns(&mut self, patterns: &[String]) {
        for pattern in patterns {
            let seq = self.next_seq;
            let stat = self
                .patterns
                .entry(pattern.clone())
                .or_insert_with(|| PatternStat {
                    count: 0,
                    first_seen: seq,
                });
            if stat.first_seen == seq {
                self.next_seq += 1;
            }
            stat.count += 1;
        }
    }

    /// Most frequent patterns; equal counts keep the order they were first seen.
    pub fn top_patterns(&self, n: usize) -> Vec<PatternCount> {
        let mut ranked: Vec<(&String, &PatternStat)> = self.patterns.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(pattern, stat)| PatternCount {
                pattern: pattern.clone(),
                count: stat.count,
            })
            .collect()
    }

    pub(crate) fn count_message(&mut self) {
        self.message_count += 1;
    }

    /// Read-only view exposing at most `max_patterns` patterns.
    pub fn context(&self, max_patterns: usize) -> ResponseContext {
        ResponseContext {
            topics: self.topics.iter().cloned().collect(),
            patterns: self.top_patterns(max_patterns),
            preferences: self.preferences,
            message_count: self.message_count,
        }
    }
}

/// What the response pipeline and prompt builder see of a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext {
    pub topics: Vec<String>,
    pub patterns: Vec<PatternCount>,
    pub preferences: Preferences,
    pub message_count: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_nudge_clamps() {
        let mut prefs = Preferences::default();
        for _ in 0..30 {
            prefs.nudge(Preference::Formality, 0.05);
            prefs.nudge(Preference::Verbosity, -0.05);
        }
        assert_eq!(prefs.formality, 1.0);
        assert_eq!(prefs.verbosity, 0.0);
        assert_eq!(prefs.get(Preference::Technicality), 0.5);
    }

    #[test]
    fn test_topics_move_to_end_when_seen_again() {
        let mut profile = UserLearningProfile::default();
        profile.remember_topics(&strings(&["rust", "tokio"]), 10);
        profile.remember_topics(&strings(&["rust"]), 10);
        assert_eq!(profile.topics().collect::<Vec<_>>(), vec!["tokio", "rust"]);
    }

    #[test]
    fn test_topics_evict_oldest() {
        let mut profile = UserLearningProfile::default();
        profile.remember_topics(&strings(&["a1", "b2", "c3"]), 2);
        assert_eq!(profile.topics().collect::<Vec<_>>(), vec!["b2", "c3"]);
    }

    #[test]
    fn test_top_patterns_order() {
        let mut profile = UserLearningProfile::default();
        profile.record_patterns(&strings(&["good morning", "hey there"]));
        profile.record_patterns(&strings(&["hey there", "what's up"]));
        let top = profile.top_patterns(5);
        assert_eq!(top[0], PatternCount { pattern: "hey there".into(), count: 2 });
        assert_eq!(top[1].pattern, "good morning");
        assert_eq!(top[2].pattern, "what's up");
        assert_eq!(profile.top_patterns(1).len(), 1);
        assert_eq!(profile.distinct_patterns(), 3);
    }

    #[test]
    fn test_default_context() {
        let ctx = UserLearningProfile::default().context(5);
        assert_eq!(ctx, ResponseContext::default());
        assert_eq!(ctx.preferences.formality, 0.5);
    }
}
