//! Aggregate-function catalogue
//!
//! Named aggregates requested by callers (`avg`, `stddev`, ...) decompose
//! into the minimal set of raw per-bucket accumulators the downstream
//! step actually maintains: an average needs a running sum and count, a
//! standard deviation additionally needs a sum of squares.

use crate::error::{AggregationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A named aggregate function a caller can request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Count,
    Sum,
    Sqr,
    Avg,
    Max,
    Min,
    Last,
    First,
    Stddev,
    Stdvar,
}

/// A minimal per-bucket accumulator from which named aggregates are
/// derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawAggregate {
    Count,
    Sum,
    Sqr,
    Max,
    Min,
    Last,
    First,
}

impl Aggregate {
    /// Every supported aggregate name.
    pub const ALL: [Aggregate; 10] = [
        Aggregate::Count,
        Aggregate::Sum,
        Aggregate::Sqr,
        Aggregate::Avg,
        Aggregate::Max,
        Aggregate::Min,
        Aggregate::Last,
        Aggregate::First,
        Aggregate::Stddev,
        Aggregate::Stdvar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Sqr => "sqr",
            Aggregate::Avg => "avg",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
            Aggregate::Last => "last",
            Aggregate::First => "first",
            Aggregate::Stddev => "stddev",
            Aggregate::Stdvar => "stdvar",
        }
    }

    /// The raw accumulators this aggregate is derived from.
    pub fn raw_aggregates(&self) -> &'static [RawAggregate] {
        match self {
            Aggregate::Count => &[RawAggregate::Count],
            Aggregate::Sum => &[RawAggregate::Sum],
            Aggregate::Sqr => &[RawAggregate::Sqr],
            Aggregate::Max => &[RawAggregate::Max],
            Aggregate::Min => &[RawAggregate::Min],
            Aggregate::Last => &[RawAggregate::Last],
            Aggregate::First => &[RawAggregate::First],
            Aggregate::Avg => &[RawAggregate::Count, RawAggregate::Sum],
            Aggregate::Stddev | Aggregate::Stdvar => {
                &[RawAggregate::Count, RawAggregate::Sum, RawAggregate::Sqr]
            }
        }
    }
}

impl FromStr for Aggregate {
    type Err = AggregationError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "count" => Ok(Aggregate::Count),
            "sum" => Ok(Aggregate::Sum),
            "sqr" => Ok(Aggregate::Sqr),
            "avg" => Ok(Aggregate::Avg),
            "max" => Ok(Aggregate::Max),
            "min" => Ok(Aggregate::Min),
            "last" => Ok(Aggregate::Last),
            "first" => Ok(Aggregate::First),
            "stddev" => Ok(Aggregate::Stddev),
            "stdvar" => Ok(Aggregate::Stdvar),
            _ => Err(AggregationError::UnsupportedAggregate(name.to_string())),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl RawAggregate {
    pub fn name(&self) -> &'static str {
        match self {
            RawAggregate::Count => "count",
            RawAggregate::Sum => "sum",
            RawAggregate::Sqr => "sqr",
            RawAggregate::Max => "max",
            RawAggregate::Min => "min",
            RawAggregate::Last => "last",
            RawAggregate::First => "first",
        }
    }
}

impl fmt::Display for RawAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Union of the raw accumulators needed to serve every requested
/// aggregate. Order-independent and idempotent: duplicates and request
/// order do not change the result.
pub fn all_raw_aggregates(aggregates: &[Aggregate]) -> BTreeSet<RawAggregate> {
    aggregates
        .iter()
        .flat_map(|aggregate| aggregate.raw_aggregates().iter().copied())
        .collect()
}
