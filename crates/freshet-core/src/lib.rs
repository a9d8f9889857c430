//! Freshet Core - shared types for the Freshet feature-aggregation engine
//!
//! This crate provides the fundamental types used across the Freshet pipeline:
//! - `Value` for runtime data carried in event bodies
//! - `Event`, the unit of data every step receives and emits
//! - Duration-string parsing and the injectable clock
//! - Error types

pub mod error;
pub mod event;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use error::CoreError;
pub use event::{Event, EventKey};
pub use time::{one_unit_of_duration, parse_duration, Clock, ManualClock, SystemClock};
pub use types::Value;
