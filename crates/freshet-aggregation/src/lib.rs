//! Freshet Aggregation - windowing and aggregation configuration
//!
//! This crate is the configuration core of the Freshet streaming
//! feature-aggregation engine. Callers declare rolling statistics
//! ("sum of field X over the last 1h/6h/1d") and this crate turns those
//! declarations into:
//! - fixed (calendar-aligned) and sliding (now-relative) time windows
//! - merged bucket-array layouts shared by windows with a common period
//! - emit policies governing when downstream steps flush results
//! - field aggregators binding an extractor, aggregate functions,
//!   windows, and an optional filter/clamp
//!
//! It performs no aggregation arithmetic, no I/O, and no scheduling;
//! every type is immutable once validated and safe to share for reads.

pub mod aggregate;
pub mod emit;
pub mod error;
pub mod field;
pub mod registry;
pub mod window;

// Re-export main types
pub use aggregate::{all_raw_aggregates, Aggregate, RawAggregate};
pub use emit::{EmissionType, EmitPolicy, EmitTrigger};
pub use error::{AggregationError, Result};
pub use field::{EventFilter, FieldAggregator, ValueExtractor};
pub use registry::{FeatureCollection, FeatureRegistry, FieldAggregatorConfig, WindowsConfig};
pub use window::{
    FixedWindow, FixedWindows, SlidingWindow, SlidingWindows, WindowSet, Windows,
    BUCKETS_PER_WINDOW,
};
