//! Error types for ctxcopy masking

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Strategy '{strategy}' does not preserve length and cannot be used by the {adapter} adapter")]
    StrategyNotLengthPreserving {
        strategy: &'static str,
        adapter: &'static str,
    },

    #[error("Masked output length mismatch: expected {expected} characters, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Detection span {start}..{end} is out of bounds or not on a character boundary")]
    InvalidSpan { start: usize, end: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
