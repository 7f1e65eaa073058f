//! Tokenization and word lists for preference learning.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Words, with internal apostrophes kept (`what's`, `don't`).
static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}\p{N}]+)*").unwrap());

/// English stop-words ignored when extracting topics.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "couldn", "couldn't", "d", "did", "didn", "didn't",
    "do", "does", "doesn", "doesn't", "doing", "don", "don't", "down", "during", "each", "few",
    "for", "from", "further", "had", "hadn", "hadn't", "has", "hasn", "hasn't", "have", "haven",
    "haven't", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
    "i", "if", "in", "into", "is", "isn", "isn't", "it", "it's", "its", "itself", "just", "ll",
    "m", "ma", "me", "mightn", "mightn't", "more", "most", "mustn", "mustn't", "my", "myself",
    "needn", "needn't", "no", "nor", "not", "now", "o", "of", "off", "on", "once", "only", "or",
    "other", "our", "ours", "ourselves", "out", "over", "own", "re", "s", "same", "shan",
    "shan't", "she", "she's", "should", "should've", "shouldn", "shouldn't", "so", "some",
    "such", "t", "than", "that", "that'll", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "ve", "very", "was", "wasn", "wasn't", "we", "were", "weren", "weren't", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "won", "won't",
    "wouldn", "wouldn't", "y", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

static STOP_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Maximum topics extracted from a single message.
pub const TOPICS_PER_MESSAGE: usize = 3;

/// Lowercased word tokens in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_SET.contains(token)
}

/// Tokens eligible to become topics: alphanumeric, longer than two
/// characters, not stop-words.
pub fn candidate_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 2)
        .filter(|t| t.chars().all(char::is_alphanumeric))
        .filter(|t| !is_stop_word(t))
        .collect()
}

/// Up to three candidate tokens that occur more than once, most frequent
/// first. Equal counts keep first-occurrence order.
pub fn extract_topics(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, token) in candidate_tokens(text).into_iter().enumerate() {
        counts.entry(token).or_insert((0, position)).0 += 1;
    }

    let mut repeated: Vec<(String, usize, usize)> = counts
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    repeated.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    repeated
        .into_iter()
        .take(TOPICS_PER_MESSAGE)
        .map(|(token, _, _)| token)
        .collect()
}

/// Adjacent token pairs, joined by a space, in order.
pub fn extract_patterns(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

/// Whitespace-separated words divided by the number of `.`-separated
/// segments. Empty segments count, so a trailing period adds a sentence;
/// `!` and `?` do not split.
pub fn words_per_sentence(text: &str) -> f32 {
    let words = text.split_whitespace().count();
    let sentences = text.split('.').count().max(1);
    words as f32 / sentences as f32
}

/// Whole-word, case-insensitive counter for a fixed word list.
#[derive(Debug, Clone)]
pub struct LexiconMatcher {
    pattern: Regex,
}

impl LexiconMatcher {
    pub fn new(words: &[String]) -> Result<Self, regex::Error> {
        let alternation = words
            .iter()
            .map(|w| regex::escape(&w.to_lowercase()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))?;
        Ok(Self { pattern })
    }

    /// Number of matches in `text` (case-insensitive).
    pub fn count(&self, text: &str) -> usize {
        self.pattern.find_iter(&text.to_lowercase()).count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_contractions() {
        assert_eq!(tokenize("Hey, what's UP?"), vec!["hey", "what's", "up"]);
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... !!").is_empty());
    }

    #[test]
    fn test_candidates_drop_short_and_stop_words() {
        let candidates = candidate_tokens("please kindly help me understand this API function");
        assert_eq!(
            candidates,
            vec!["please", "kindly", "help", "understand", "api", "function"]
        );
    }

    #[test]
    fn test_candidates_drop_contractions() {
        assert!(candidate_tokens("what's that's").is_empty());
    }

    #[test]
    fn test_topics_require_repetition() {
        assert!(extract_topics("please kindly help me understand this API function").is_empty());
        assert_eq!(
            extract_topics("rust traits and rust lifetimes, traits everywhere in rust"),
            vec!["rust", "traits"]
        );
    }

    #[test]
    fn test_topics_capped_at_three_with_stable_ties() {
        let text = "delta alpha beta gamma delta alpha beta gamma";
        assert_eq!(extract_topics(text), vec!["delta", "alpha", "beta"]);
    }

    #[test]
    fn test_topics_empty_input() {
        assert!(extract_topics("").is_empty());
        assert!(extract_patterns("").is_empty());
        assert!(extract_patterns("single").is_empty());
    }

    #[test]
    fn test_patterns_are_bigrams() {
        assert_eq!(
            extract_patterns("Hey what's up"),
            vec!["hey what's", "what's up"]
        );
    }

    #[test]
    fn test_words_per_sentence() {
        assert_eq!(words_per_sentence("hey what's up"), 3.0);
        assert_eq!(words_per_sentence("One two. Three four five six."), 2.0);
        assert_eq!(words_per_sentence("Wait! Stop! Listen now."), 2.0);
        assert_eq!(words_per_sentence(""), 0.0);
    }

    #[test]
    fn test_lexicon_matcher_whole_words() {
        let matcher =
            LexiconMatcher::new(&["hi".to_string(), "may".to_string()]).unwrap();
        assert_eq!(matcher.count("Hi there, maybe this may work. HI!"), 3);
        assert_eq!(matcher.count("this thing"), 0);
    }
}
