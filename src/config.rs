//! Engine configuration.
//!
//! Settings load from an optional YAML file and are then overridden by
//! environment variables. Every section has defaults, so an empty file (or no
//! file at all) yields a working configuration.
//!
//! # Environment Variables
//!
//! - `PERSONA_CONFIG` — path to a YAML settings file
//! - `PERSONA_BACKEND` — generation backend, `gemini` or `openrouter`
//! - `GOOGLE_API_KEY` — Gemini API key
//! - `GOOGLE_API_URL` — Gemini endpoint
//! - `OPENROUTER_API_KEY` — OpenRouter API key
//! - `OPENROUTER_MODEL` — OpenRouter model identifier
//! - `PERSONA_DB_PATH` — SQLite database path
//! - `PORT` — HTTP port

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Default Gemini endpoint used when `GOOGLE_API_URL` is unset.
pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Default OpenRouter chat-completions endpoint.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub personality: PersonalitySettings,
    pub learning: LearningSettings,
    pub memory: MemorySettings,
    pub backend: BackendSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Parse settings from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Load settings from `PERSONA_CONFIG` (if set) and apply env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var("PERSONA_CONFIG") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            settings.backend.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("GOOGLE_API_URL") {
            settings.backend.api_url = url;
        }
        if let Ok(provider) = std::env::var("PERSONA_BACKEND") {
            settings.backend.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            settings.backend.openrouter.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            settings.backend.openrouter.model = model;
        }
        if let Ok(path) = std::env::var("PERSONA_DB_PATH") {
            settings.memory.database_path = path;
        }
        if let Ok(port) = std::env::var("PORT") {
            settings.server.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT is not a number: {}", port)))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.personality.validate()?;
        self.learning.validate()?;
        if self.memory.max_memories == 0 || self.memory.max_recent_interactions == 0 {
            return Err(ConfigError::Validation(
                "memory.max_memories and memory.max_recent_interactions must be positive".into(),
            ));
        }
        if !self.memory.memory_types.iter().any(|k| k == crate::memory::USER_NOTE) {
            return Err(ConfigError::Validation(format!(
                "memory.memory_types must include {}",
                crate::memory::USER_NOTE
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Initial trait values. Field names match the trait names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialTraits {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub empathy: f32,
}

impl Default for InitialTraits {
    fn default() -> Self {
        Self {
            openness: 0.7,
            conscientiousness: 0.8,
            extraversion: 0.6,
            agreeableness: 0.75,
            empathy: 0.7,
        }
    }
}

/// Range (inclusive, whole minutes) a mood lasts before it may expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDuration {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl Default for StateDuration {
    fn default() -> Self {
        Self {
            min_minutes: 5,
            max_minutes: 15,
        }
    }
}

/// Step sizes for trait adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentRates {
    pub small: f32,
    pub medium: f32,
}

impl Default for AdjustmentRates {
    fn default() -> Self {
        Self {
            small: 0.02,
            medium: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalitySettings {
    pub initial_traits: InitialTraits,
    pub emotional_state_duration: StateDuration,
    pub trait_adjustment_rates: AdjustmentRates,
}

impl PersonalitySettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.emotional_state_duration;
        if d.min_minutes == 0 {
            return Err(ConfigError::Validation(
                "emotional_state_duration.min_minutes must be at least 1".into(),
            ));
        }
        if d.min_minutes > d.max_minutes {
            return Err(ConfigError::Validation(format!(
                "emotional_state_duration min ({}) exceeds max ({})",
                d.min_minutes, d.max_minutes
            )));
        }
        let t = &self.initial_traits;
        for (name, value) in [
            ("openness", t.openness),
            ("conscientiousness", t.conscientiousness),
            ("extraversion", t.extraversion),
            ("agreeableness", t.agreeableness),
            ("empathy", t.empathy),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "initial trait {} = {} is outside [0, 1]",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

fn default_technical_keywords() -> Vec<String> {
    [
        "api", "function", "code", "data", "system", "process", "technical", "algorithm",
        "database", "interface", "module", "parameter", "protocol", "query", "server",
        "variable", "framework",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_formal_indicators() -> Vec<String> {
    [
        "please", "kindly", "would", "could", "may", "regarding", "concerning", "therefore",
        "hence", "thus", "furthermore", "moreover",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_casual_indicators() -> Vec<String> {
    [
        "hey", "hi", "yeah", "cool", "awesome", "gonna", "wanna", "gotta", "dunno", "sup",
        "btw", "lol", "omg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSettings {
    /// Retained unique topics per user.
    pub max_topics: usize,
    /// Patterns exposed in a response context.
    pub max_patterns: usize,
    /// Step applied to every preference nudge.
    pub preference_adjustment_rate: f32,
    /// Words-per-sentence below this nudges verbosity down.
    pub concise_words_per_sentence: f32,
    /// Words-per-sentence above this nudges verbosity up.
    pub verbose_words_per_sentence: f32,
    pub technical_keywords: Vec<String>,
    pub formal_indicators: Vec<String>,
    pub casual_indicators: Vec<String>,
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self {
            max_topics: 10,
            max_patterns: 5,
            preference_adjustment_rate: 0.05,
            concise_words_per_sentence: 8.0,
            verbose_words_per_sentence: 15.0,
            technical_keywords: default_technical_keywords(),
            formal_indicators: default_formal_indicators(),
            casual_indicators: default_casual_indicators(),
        }
    }
}

impl LearningSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_topics == 0 || self.max_patterns == 0 {
            return Err(ConfigError::Validation(
                "learning.max_topics and learning.max_patterns must be positive".into(),
            ));
        }
        if self.technical_keywords.is_empty()
            || self.formal_indicators.is_empty()
            || self.casual_indicators.is_empty()
        {
            return Err(ConfigError::Validation(
                "learning lexicons must not be empty".into(),
            ));
        }
        if self.concise_words_per_sentence > self.verbose_words_per_sentence {
            return Err(ConfigError::Validation(
                "learning.concise_words_per_sentence exceeds verbose_words_per_sentence".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub database_path: String,
    pub max_memories: usize,
    pub max_recent_interactions: usize,
    pub importance_threshold: f64,
    /// Kinds `store_memory` accepts.
    pub memory_types: Vec<String>,
    pub retention_days: u32,
    /// Memory snippets included in the generation prompt.
    pub prompt_memory_limit: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            database_path: "bot_memory.db".into(),
            max_memories: 100,
            max_recent_interactions: 50,
            importance_threshold: 0.5,
            memory_types: ["user_note", "conversation", "preference", "fact", "opinion"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retention_days: 30,
            prompt_memory_limit: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// One harm-category threshold forwarded to the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Safety configuration passed with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafetyConfig(pub Vec<SafetySetting>);

impl Default for SafetyConfig {
    fn default() -> Self {
        let block = |category: &str| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        };
        Self(vec![
            block("HARM_CATEGORY_HARASSMENT"),
            block("HARM_CATEGORY_HATE_SPEECH"),
            block("HARM_CATEGORY_SEXUALLY_EXPLICIT"),
            block("HARM_CATEGORY_DANGEROUS_CONTENT"),
        ])
    }
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 2048,
            stop_sequences: Vec::new(),
        }
    }
}

impl GenerationParams {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Which generation service the server talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    #[default]
    Gemini,
    OpenRouter,
}

impl std::str::FromStr for BackendProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openrouter" => Ok(Self::OpenRouter),
            other => Err(ConfigError::Validation(format!(
                "unknown backend provider: {}",
                other
            ))),
        }
    }
}

/// OpenRouter chat-completions settings. `max_conversation_length` bounds
/// the per-user history to that many exchanges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterSettings {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_conversation_length: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OPENROUTER_URL.into(),
            api_key: None,
            model: "google/gemma-3-12b-it:free".into(),
            max_conversation_length: 10,
            temperature: 0.7,
            max_tokens: 1000,
            top_p: 0.95,
        }
    }
}

/// Generation backend settings. `api_url`, `api_key` and `generation`
/// configure Gemini; `openrouter` holds the OpenRouter equivalents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub provider: BackendProvider,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub safety: SafetyConfig,
    pub generation: GenerationParams,
    pub openrouter: OpenRouterSettings,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Gemini,
            api_url: DEFAULT_API_URL.into(),
            api_key: None,
            timeout_secs: 60,
            safety: SafetyConfig::default(),
            generation: GenerationParams::default(),
            openrouter: OpenRouterSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

// ============================================================================
// Tests
// ============================================================================
