//! Error types for Freshet Aggregation
//!
//! Every failure here is a validation failure raised synchronously at
//! construction or merge time; nothing is retried or downgraded to a
//! default, and a failed constructor leaves no partially built value.

use freshet_core::CoreError;
use thiserror::Error;

/// Aggregation-configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// A duration string failed to parse
    #[error(transparent)]
    InvalidDuration(#[from] CoreError),

    /// A sliding-window period does not evenly divide its window
    #[error("period {period_millis}ms must be a divisor of window '{window}' ({window_millis}ms)")]
    NonDivisiblePeriod {
        window: String,
        window_millis: i64,
        period_millis: i64,
    },

    /// A window set was constructed with zero windows
    #[error("windows list cannot be empty")]
    EmptyWindowList,

    /// A merge was attempted between window sets with different periods
    #[error("cannot merge window sets with different periods: {left_millis}ms vs {right_millis}ms")]
    IncompatiblePeriods {
        left_millis: i64,
        right_millis: i64,
    },

    /// A merge was attempted between a fixed and a sliding window set
    #[error("cannot merge fixed and sliding window sets")]
    MismatchedWindowKinds,

    /// An emit policy configuration names an unrecognized mode
    #[error("unsupported emit policy mode: '{0}'")]
    UnsupportedEmitMode(String),

    /// A required emit policy field is absent from the configuration
    #[error("missing required emit policy parameter: '{parameter}'")]
    MissingEmitParameter { parameter: String },

    /// The configuration contains fields not consumed by the selected mode
    #[error("unexpected emit policy parameters: {parameters:?}")]
    UnexpectedEmitParameter { parameters: Vec<String> },

    /// An emit policy field is present but carries an invalid value
    #[error("invalid emit policy parameter '{parameter}': {reason}")]
    InvalidEmitParameter { parameter: String, reason: String },

    /// A requested aggregate name is absent from the catalogue
    #[error("unsupported aggregate: '{0}'")]
    UnsupportedAggregate(String),
}

pub type Result<T> = std::result::Result<T, AggregationError>;
