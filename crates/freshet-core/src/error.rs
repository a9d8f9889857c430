//! Error types for Freshet Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A duration string failed to parse
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },
}

impl CoreError {
    pub(crate) fn invalid_duration(input: &str, reason: impl Into<String>) -> Self {
        CoreError::InvalidDuration {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
