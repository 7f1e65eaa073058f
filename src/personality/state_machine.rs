//! Emotional state machine.
//!
//! Moods expire lazily: nothing runs in the background, and a poll through
//! [`EmotionalStateMachine::current_state`] performs the transition when the
//! current duration has elapsed. Strong sentiment forces a transition
//! immediately.
//!
//! ```text
//! message ──► SentimentScorer ──► compound score
//!                                   ├─ > +0.3   → extraversion↑ agreeableness↑
//!                                   ├─ < -0.3   → empathy↑
//!                                   └─ |s| > 0.5 → forced transition
//! interrogatives (why/how/what/when/where) → openness↑ conscientiousness↑
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::emotion::EmotionalState;
use super::sentiment::{LexiconSentimentScorer, SentimentScorer};
use super::traits::{Trait, TraitVector};
use crate::config::{AdjustmentRates, PersonalitySettings};

/// Compound score above which the message counts as positive.
pub const POSITIVE_THRESHOLD: f32 = 0.3;
/// Compound score below which the message counts as negative.
pub const NEGATIVE_THRESHOLD: f32 = -0.3;
/// Absolute score above which the mood changes immediately.
pub const FORCED_TRANSITION_THRESHOLD: f32 = 0.5;
/// Agreeableness step on positive messages.
pub const AGREEABLENESS_STEP: f32 = 0.03;

static INTERROGATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:why|how|what|when|where)\b").unwrap());

/// A completed mood change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: EmotionalState,
    pub to: EmotionalState,
    pub duration: Duration,
}

/// What a message did to the personality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalOutcome {
    /// Compound score used, `0.0` if scoring failed.
    pub score: f32,
    /// Whether the message carried an interrogative marker.
    pub interrogative: bool,
    /// Set when the score forced a transition.
    pub forced: Option<Transition>,
}

/// Snapshot of the personality for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalitySummary {
    pub emotional_state: EmotionalState,
    pub traits: BTreeMap<String, f32>,
}

/// The agent's mood plus the traits that bias it.
pub struct EmotionalStateMachine {
    traits: TraitVector,
    current: EmotionalState,
    last_transition: DateTime<Utc>,
    duration: Duration,
    min_minutes: u32,
    max_minutes: u32,
    rates: AdjustmentRates,
    scorer: Box<dyn SentimentScorer>,
    rng: Box<dyn RngCore + Send>,
}

impl std::fmt::Debug for EmotionalStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionalStateMachine")
            .field("current", &self.current)
            .field("last_transition", &self.last_transition)
            .field("duration", &self.duration)
            .field("traits", &self.traits)
            .finish_non_exhaustive()
    }
}

impl EmotionalStateMachine {
    /// Machine with an entropy-seeded RNG and the lexicon scorer.
    pub fn new(settings: &PersonalitySettings) -> Self {
        Self::with_parts(
            settings,
            Box::new(StdRng::from_entropy()),
            Box::new(LexiconSentimentScorer::default()),
        )
    }

    /// Machine with injected randomness and scoring, starting now.
    pub fn with_parts(
        settings: &PersonalitySettings,
        rng: Box<dyn RngCore + Send>,
        scorer: Box<dyn SentimentScorer>,
    ) -> Self {
        Self::starting_at(settings, rng, scorer, Utc::now())
    }

    /// Machine whose initial neutral mood began at `started`.
    pub fn starting_at(
        settings: &PersonalitySettings,
        rng: Box<dyn RngCore + Send>,
        scorer: Box<dyn SentimentScorer>,
        started: DateTime<Utc>,
    ) -> Self {
        let range = &settings.emotional_state_duration;
        let min_minutes = range.min_minutes.max(1);
        let mut machine = Self {
            traits: TraitVector::new(&settings.initial_traits),
            current: EmotionalState::Neutral,
            last_transition: started,
            duration: Duration::minutes(min_minutes as i64),
            min_minutes,
            max_minutes: range.max_minutes.max(min_minutes),
            rates: settings.trait_adjustment_rates.clone(),
            scorer,
            rng,
        };
        machine.duration = machine.draw_duration();
        machine
    }

    /// Active mood, transitioning first if the current one has expired.
    pub fn current_state(&mut self) -> EmotionalState {
        self.current_state_at(Utc::now())
    }

    pub fn current_state_at(&mut self, now: DateTime<Utc>) -> EmotionalState {
        if now - self.last_transition > self.duration {
            self.transition_at(now);
        }
        self.current
    }

    /// Active mood without checking expiry.
    pub fn peek_state(&self) -> EmotionalState {
        self.current
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn last_transition(&self) -> DateTime<Utc> {
        self.last_transition
    }

    pub fn traits(&self) -> &TraitVector {
        &self.traits
    }

    pub fn adjust_trait(&mut self, t: Trait, delta: f32) -> f32 {
        let value = self.traits.adjust(t, delta);
        log::debug!("trait {} adjusted by {:+.2} -> {:.2}", t, delta, value);
        value
    }

    /// Randomness shared with reply decoration.
    pub fn rng(&mut self) -> &mut (dyn RngCore + Send) {
        self.rng.as_mut()
    }

    /// Move to a different mood, chosen by trait-weighted draw.
    pub fn transition(&mut self) -> Transition {
        self.transition_at(Utc::now())
    }

    pub fn transition_at(&mut self, now: DateTime<Utc>) -> Transition {
        let from = self.current;
        let candidates: Vec<EmotionalState> = EmotionalState::ALL
            .into_iter()
            .filter(|s| *s != from)
            .collect();
        let weights: Vec<f32> = candidates
            .iter()
            .map(|s| s.trait_affinity().map_or(1.0, |t| self.traits.value(t)))
            .collect();

        // WeightedIndex normalizes; it rejects an all-zero table.
        let pick = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.rng.gen_range(0..candidates.len()),
        };

        self.current = candidates[pick];
        self.last_transition = now;
        self.duration = self.draw_duration();

        log::debug!(
            "emotional state {} -> {} for {} minutes",
            from,
            self.current,
            self.duration.num_minutes()
        );

        Transition {
            from,
            to: self.current,
            duration: self.duration,
        }
    }

    /// Adjust traits (and possibly the mood) from a user message.
    pub fn adapt_to_signal(&mut self, message: &str) -> SignalOutcome {
        self.adapt_to_signal_at(message, Utc::now())
    }

    pub fn adapt_to_signal_at(&mut self, message: &str, now: DateTime<Utc>) -> SignalOutcome {
        let score = match self.scorer.score(message) {
            Ok(s) if s.is_finite() => s.clamp(-1.0, 1.0),
            Ok(_) => 0.0,
            Err(e) => {
                log::debug!("sentiment scoring skipped: {}", e);
                0.0
            }
        };

        if score > POSITIVE_THRESHOLD {
            self.adjust_trait(Trait::Extraversion, self.rates.medium);
            self.adjust_trait(Trait::Agreeableness, AGREEABLENESS_STEP);
        } else if score < NEGATIVE_THRESHOLD {
            self.adjust_trait(Trait::Empathy, self.rates.medium);
        }

        let interrogative = INTERROGATIVE.is_match(&message.to_lowercase());
        if interrogative {
            self.adjust_trait(Trait::Openness, self.rates.small);
            self.adjust_trait(Trait::Conscientiousness, self.rates.small);
        }

        let forced = if score.abs() > FORCED_TRANSITION_THRESHOLD {
            log::debug!("sentiment {:.2} forces a mood change", score);
            Some(self.transition_at(now))
        } else {
            None
        };

        SignalOutcome {
            score,
            interrogative,
            forced,
        }
    }

    pub fn summary(&self) -> PersonalitySummary {
        PersonalitySummary {
            emotional_state: self.current,
            traits: self.traits.to_map(),
        }
    }

    fn draw_duration(&mut self) -> Duration {
        let minutes = self.rng.gen_range(self.min_minutes..=self.max_minutes);
        Duration::minutes(minutes as i64)
    }
}

// ============================================================================
// Tests
// ============================================================================
