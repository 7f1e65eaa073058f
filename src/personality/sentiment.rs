//! Lexical sentiment scoring.
//!
//! Scores are "compound" values in `[-1, 1]`: word valences are summed with
//! negation and intensifier handling, exclamation marks push the sum further
//! from zero, and the total is squashed with `x / sqrt(x² + α)`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SentimentError;

/// Produces a compound sentiment score for a message.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<f32, SentimentError>;
}

/// Always returns the same score. Useful to pin mood dynamics.
#[derive(Debug, Clone, Copy)]
pub struct StaticSentimentScorer(pub f32);

impl SentimentScorer for StaticSentimentScorer {
    fn score(&self, _text: &str) -> Result<f32, SentimentError> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Lexicon scorer
// ---------------------------------------------------------------------------

const NORMALIZATION_ALPHA: f32 = 15.0;
const NEGATION_SCALAR: f32 = -0.74;
const INTENSIFIER_BOOST: f32 = 0.293;
const EXCLAMATION_BOOST: f32 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}\p{N}]+)*").unwrap());

const VALENCES: &[(&str, f32)] = &[
    ("amazing", 2.8),
    ("appreciate", 1.7),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("brilliant", 2.8),
    ("cool", 1.3),
    ("delighted", 2.9),
    ("enjoy", 2.2),
    ("excellent", 3.2),
    ("excited", 1.4),
    ("fantastic", 2.6),
    ("fun", 2.3),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("helpful", 1.8),
    ("lol", 1.8),
    ("love", 3.2),
    ("nice", 1.8),
    ("perfect", 2.7),
    ("pleased", 1.9),
    ("thank", 1.5),
    ("thanks", 1.9),
    ("wonderful", 2.7),
    ("yay", 2.4),
    ("angry", -2.3),
    ("annoying", -1.7),
    ("awful", -2.0),
    ("bad", -2.5),
    ("broken", -1.6),
    ("cry", -2.1),
    ("depressed", -2.3),
    ("disappointed", -1.9),
    ("error", -1.4),
    ("fail", -2.5),
    ("failed", -2.3),
    ("frustrated", -1.5),
    ("hate", -2.7),
    ("horrible", -2.5),
    ("hurt", -2.4),
    ("lonely", -1.5),
    ("pain", -2.3),
    ("problem", -1.7),
    ("sad", -2.1),
    ("scared", -1.9),
    ("stupid", -2.4),
    ("sucks", -1.5),
    ("terrible", -2.1),
    ("upset", -1.6),
    ("useless", -1.8),
    ("worried", -1.9),
    ("worst", -3.1),
    ("wrong", -2.1),
];

const INTENSIFIERS: &[&str] = &[
    "absolutely",
    "extremely",
    "incredibly",
    "really",
    "so",
    "super",
    "totally",
    "very",
];

const NEGATIONS: &[&str] = &[
    "cannot", "neither", "never", "no", "nobody", "none", "nor", "not", "nothing", "without",
];

/// Default scorer backed by a small valence lexicon.
#[derive(Debug, Clone)]
pub struct LexiconSentimentScorer {
    valences: HashMap<String, f32>,
}

impl Default for LexiconSentimentScorer {
    fn default() -> Self {
        Self {
            valences: VALENCES
                .iter()
                .map(|(word, v)| (word.to_string(), *v))
                .collect(),
        }
    }
}

impl LexiconSentimentScorer {
    fn is_negation(token: &str) -> bool {
        NEGATIONS.contains(&token) || token.ends_with("n't")
    }

    /// Raw, unnormalized valence sum.
    fn raw_sum(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN.find_iter(&lower).map(|m| m.as_str()).collect();

        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.valences.get(*token) else {
                continue;
            };
            let mut valence = base;

            if i > 0 && INTENSIFIERS.contains(&tokens[i - 1]) {
                valence += INTENSIFIER_BOOST * valence.signum();
            }

            let window = i.saturating_sub(3)..i;
            if tokens[window].iter().any(|t| Self::is_negation(t)) {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f32;
            sum += bangs * EXCLAMATION_BOOST * sum.signum();
        }
        sum
    }
}

impl SentimentScorer for LexiconSentimentScorer {
    fn score(&self, text: &str) -> Result<f32, SentimentError> {
        let sum = self.raw_sum(text);
        if !sum.is_finite() {
            return Err(SentimentError(format!("non-finite valence sum for {:?}", text)));
        }
        Ok((sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> f32 {
        LexiconSentimentScorer::default().score(text).unwrap()
    }

    #[test]
    fn test_empty_and_neutral_text_score_zero() {
        assert_eq!(score(""), 0.0);
        assert_eq!(score("hey what's up"), 0.0);
        assert_eq!(score("!!!"), 0.0);
    }

    #[test]
    fn test_strong_positive() {
        let s = score("This is amazing, I love it! Thanks so much!");
        assert!(s > 0.5, "score = {}", s);
    }

    #[test]
    fn test_strong_negative() {
        let s = score("This is terrible and I hate it, worst day ever");
        assert!(s < -0.5, "score = {}", s);
    }

    #[test]
    fn test_negation_flips_sign() {
        assert!(score("this is good") > 0.0);
        assert!(score("this is not good") < 0.0);
        assert!(score("it isn't bad") > 0.0);
    }

    #[test]
    fn test_intensifier_and_exclamation_amplify() {
        assert!(score("very good") > score("good"));
        assert!(score("good!!") > score("good"));
    }

    #[test]
    fn test_score_is_bounded() {
        let gush = "love ".repeat(200);
        let s = score(&gush);
        assert!(s <= 1.0 && s > 0.99);
    }

    #[test]
    fn test_static_scorer() {
        assert_eq!(StaticSentimentScorer(-0.8).score("anything").unwrap(), -0.8);
    }
}
