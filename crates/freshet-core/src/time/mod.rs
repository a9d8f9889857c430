//! Time utilities for Freshet
//!
//! Duration-string parsing and the injectable clock used by all
//! window/period boundary arithmetic.

pub mod clock;
pub mod duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::{one_unit_of_duration, parse_duration};
