//! Error types for the codenat pipeline

use std::fmt;
use thiserror::Error;

/// Why a proposed identifier was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRejection {
    Empty,
    Grammar,
    Keyword,
    Collision,
}

impl fmt::Display for IdentifierRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty name"),
            Self::Grammar => write!(f, "not a Java identifier"),
            Self::Keyword => write!(f, "reserved word"),
            Self::Collision => write!(f, "name already in use"),
        }
    }
}

/// Main error type for the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid identifier `{candidate}`: {reason}")]
    InvalidIdentifier { candidate: String, reason: IdentifierRejection },

    #[error("random name generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: usize },

    #[error("unexpected masked-model output shape: {0}")]
    OracleShapeMismatch(String),

    #[error("invalid baseline entropy {entropy}: the original program must have a positive, finite loss")]
    InvalidBaseline { entropy: f64 },

    #[error("no metadata record for `{key}`")]
    MissingMetadata { key: String },

    #[error("lexical error at byte {offset}: unexpected `{text}`")]
    Lex { offset: usize, text: String },

    #[error("context window for slot `{slot}` lost its mask placeholder")]
    MaskLost { slot: String },

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Errors that only cost the current file or group, never the whole run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::OracleUnavailable(_))
    }
}
