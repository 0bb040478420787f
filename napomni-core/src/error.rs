//! Error taxonomy for the core.
//!
//! `ParseError` is user-facing: its message is meant to be shown back to the
//! person who typed the command. `ModelError` means persisted canonical text
//! is corrupt, which is a storage bug rather than a user mistake.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("command does not match any known form: {0}")]
    GrammarMismatch(String),

    #[error("unknown month: {0:?}")]
    UnknownMonth(String),

    #[error("unknown day or weekday: {0:?}")]
    UnknownRelativeToken(String),

    #[error("unknown duration unit: {0:?}")]
    UnknownDurationUnit(String),

    #[error("no such date or time: {0}")]
    InvalidDateTime(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("malformed canonical value {value:?}: {reason}")]
    MalformedCanonicalValue { value: String, reason: &'static str },
}

impl ModelError {
    pub(crate) fn malformed(value: &str, reason: &'static str) -> Self {
        ModelError::MalformedCanonicalValue {
            value: value.to_string(),
            reason,
        }
    }
}
