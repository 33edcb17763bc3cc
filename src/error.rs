//! Error types shared by the engine and the HTTP layer.
//!
//! Classification faults (`ScoringError`) never escape a single item: the
//! classifier turns them into an `ERROR` result. Only `BatchSourceError`
//! (request-level validation) and `LexiconError` (load-time validation)
//! reach callers.

use thiserror::Error;

/// Fault raised while scoring one text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("score tally overflowed while adding weight {weight}")]
    ScoreOverflow { weight: u32 },

    #[error("scoring panicked: {0}")]
    Panicked(String),

    #[error("strategy `{name}` failed: {reason}")]
    Strategy { name: &'static str, reason: String },
}

/// The batch input was rejected before any text was classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchSourceError {
    #[error("No file uploaded")]
    NoFile,

    #[error("No file selected")]
    NoFilename,

    #[error("Only .txt files allowed")]
    UnsupportedExtension,

    #[error("File is not valid UTF-8")]
    NotUtf8,

    #[error("File is empty")]
    Empty,

    #[error("File exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Malformed upload: {0}")]
    Malformed(String),
}

/// Lexicon configuration that failed validation at load time.
#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("empty term in {section}")]
    EmptyTerm { section: String },

    #[error("group for {polarity} {kind}s has zero weight")]
    ZeroWeight {
        polarity: &'static str,
        kind: &'static str,
    },

    #[error("{name} = {value} is outside [0, 1]")]
    InvalidConfidence { name: &'static str, value: f32 },

    #[error("policy is not monotonic: {0}")]
    NonMonotonic(String),

    #[error("failed to parse lexicon TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read lexicon config: {0}")]
    Io(#[from] std::io::Error),
}
