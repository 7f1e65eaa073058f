//! Response adapter: emotional marker, then preference rewrite.
//!
//! Neither pass can fail. A pass that finds nothing to do returns its input
//! unchanged.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::learning::Preferences;
use crate::personality::{style_for, EmotionalState, DECORATED_EXPRESSIONS};

/// Dial value above which the "high" rewrite applies.
pub const HIGH_PREFERENCE: f32 = 0.7;
/// Dial value below which the "low" rewrite applies.
pub const LOW_PREFERENCE: f32 = 0.3;
/// Replies at most this many characters are never trimmed.
pub const TRIM_MIN_CHARS: usize = 100;

type Rules = Lazy<Vec<(Regex, &'static str)>>;

fn compile(pairs: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    pairs
        .iter()
        .map(|(from, to)| (Regex::new(&format!(r"\b{}\b", regex::escape(from))).unwrap(), *to))
        .collect()
}

static FORMAL: Rules = Lazy::new(|| {
    compile(&[
        ("yeah", "yes"),
        ("nope", "no"),
        ("gonna", "going to"),
        ("wanna", "want to"),
    ])
});

static CASUAL: Rules = Lazy::new(|| {
    compile(&[
        ("certainly", "sure"),
        ("additionally", "also"),
        ("however", "but"),
    ])
});

static TECHNICAL: Rules = Lazy::new(|| {
    compile(&[("use", "utilize"), ("make", "implement"), ("fix", "resolve")])
});

static PLAIN: Rules = Lazy::new(|| {
    compile(&[("utilize", "use"), ("implement", "make"), ("resolve", "fix")])
});

/// Result of the emotional marker pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoration {
    pub text: String,
    /// Symbol chosen for the state (prepended only if the reply was bare).
    pub expression: Option<&'static str>,
    /// Adverb chosen for the state, for the caller to use as it sees fit.
    pub modifier: Option<&'static str>,
}

/// Whether the reply already carries one of the decorating symbols.
pub fn is_decorated(reply: &str) -> bool {
    DECORATED_EXPRESSIONS.iter().any(|e| reply.contains(e))
}

/// Pick a symbol and modifier for `state` and prepend the symbol unless the
/// reply is already decorated.
pub fn apply_emotional_marker<R: Rng + ?Sized>(
    reply: &str,
    state: EmotionalState,
    rng: &mut R,
) -> Decoration {
    let style = style_for(state);
    let modifier = style.modifiers.choose(rng).copied();
    let expression = style.expressions.choose(rng).copied();

    let text = match expression {
        Some(symbol) if !is_decorated(reply) => format!("{} {}", symbol, reply),
        _ => reply.to_string(),
    };

    Decoration {
        text,
        expression,
        modifier,
    }
}

fn rewrite(text: String, rules: &[(Regex, &'static str)]) -> String {
    rules.iter().fold(text, |acc, (pattern, replacement)| {
        pattern.replace_all(&acc, *replacement).into_owned()
    })
}

/// Keep every other `". "`-separated sentence, starting with the first.
///
/// Lossy: dropped sentences may carry meaning.
pub fn trim_alternate_sentences(text: &str) -> String {
    let sentences: Vec<&str> = text.split(". ").collect();
    if sentences.len() < 2 {
        return text.to_string();
    }
    let mut kept = sentences.into_iter().step_by(2).collect::<Vec<_>>().join(". ");
    if !kept.ends_with('.') {
        kept.push('.');
    }
    kept
}

/// Rewrite register, length and terminology for the user's preferences.
/// Formality first, then verbosity, then technicality.
pub fn apply_preferences(reply: &str, prefs: &Preferences) -> String {
    let mut text = reply.to_string();

    if prefs.formality > HIGH_PREFERENCE {
        text = rewrite(text, &FORMAL);
    } else if prefs.formality < LOW_PREFERENCE {
        text = rewrite(text, &CASUAL);
    }

    if prefs.verbosity < LOW_PREFERENCE && text.chars().count() > TRIM_MIN_CHARS {
        text = trim_alternate_sentences(&text);
    }

    if prefs.technicality > HIGH_PREFERENCE {
        text = rewrite(text, &TECHNICAL);
    } else if prefs.technicality < LOW_PREFERENCE {
        text = rewrite(text, &PLAIN);
    }

    text
}

/// Both passes, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAdapter;

impl ResponseAdapter {
    pub fn adapt<R: Rng + ?Sized>(
        &self,
        reply: &str,
        state: EmotionalState,
        prefs: &Preferences,
        rng: &mut R,
    ) -> Decoration {
        let marked = apply_emotional_marker(reply, state, rng);
        Decoration {
            text: apply_preferences(&marked.text, prefs),
            ..marked
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
