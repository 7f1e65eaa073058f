//! Error types for the persona engine and its collaborators.
//!
//! Only backend and store errors ever cross the engine boundary, and the
//! engine absorbs both: backend failures become the fallback reply, store
//! failures become an empty memory list.

use thiserror::Error;

/// Errors raised by a text-generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No API key configured for the backend.
    #[error("Generation backend API key not set: {0}")]
    MissingApiKey(String),

    /// The HTTP request never produced a response.
    #[error("Generation backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered, but the payload had no usable text.
    #[error("Malformed generation payload: {0}")]
    MalformedPayload(String),
}

/// Errors from the durable memory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("Memory store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Preference snapshot could not be encoded or decoded.
    #[error("Memory store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while preparing the database location.
    #[error("Memory store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker running the query panicked or was cancelled.
    #[error("Memory store worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Memory kind outside the configured `memory_types`.
    #[error("Unknown memory kind: {0}")]
    UnknownKind(String),
}

/// Errors raised while loading or validating [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid YAML for the schema.
    #[error("Config YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value parsed but violates a constraint.
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// A sentiment scorer could not produce a score.
#[derive(Debug, Error)]
#[error("Sentiment scoring failed: {0}")]
pub struct SentimentError(pub String);

/// A trait name did not match any personality dimension.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown personality trait: {0}")]
pub struct TraitParseError(pub String);
