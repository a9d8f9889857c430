//! Time windows and mergeable window sets
//!
//! A window is a span of time an aggregate is computed over; a period is
//! the granularity it is subdivided into for incremental bucket updates.
//! Window sets combine several window requests that share one period into
//! a single bucket-array layout: the combined span is the LCM of all
//! requested windows, so one circular array of `combined / period` buckets
//! serves every window simultaneously.
//!
//! Two flavours exist:
//! - [`FixedWindows`]: calendar-aligned windows ("1h" starts on the hour)
//! - [`SlidingWindows`]: windows trailing the current instant
//!
//! All current-time queries go through [`Clock`] so boundary math is
//! deterministic under test.

use crate::error::{AggregationError, Result};
use freshet_core::time::{one_unit_of_duration, parse_duration, Clock};

/// Number of periods each window is divided into when the period is
/// derived rather than supplied.
pub const BUCKETS_PER_WINDOW: i64 = 10;

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: i64, b: i64) -> i64 {
    a / gcd(a, b) * b
}

fn floor_to(timestamp: i64, step: i64) -> i64 {
    (timestamp / step) * step
}

// ============================================================================
// Single windows
// ============================================================================

/// A calendar-aligned time window, divided into [`BUCKETS_PER_WINDOW`]
/// periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWindow {
    window_millis: i64,
    period_millis: i64,
    window_str: String,
}

impl FixedWindow {
    /// Create from a duration string in the format `[0-9]+[smhd]`.
    pub fn new(window: &str) -> Result<Self> {
        let window_millis = parse_duration(window)?;
        Ok(Self {
            window_millis,
            period_millis: window_millis / BUCKETS_PER_WINDOW,
            window_str: window.to_string(),
        })
    }

    pub fn window_millis(&self) -> i64 {
        self.window_millis
    }

    pub fn period_millis(&self) -> i64 {
        self.period_millis
    }

    pub fn label(&self) -> &str {
        &self.window_str
    }

    /// Two windows' worth of periods, so the closing and opening window
    /// can overlap in one bucket array.
    pub fn total_buckets(&self) -> i64 {
        BUCKETS_PER_WINDOW * 2
    }

    /// Start of the window containing the current instant.
    pub fn current_window_start(&self, clock: &dyn Clock) -> i64 {
        floor_to(clock.now_millis(), self.window_millis)
    }

    /// Start of the period containing the current instant.
    pub fn current_period_start(&self, clock: &dyn Clock) -> i64 {
        floor_to(clock.now_millis(), self.period_millis)
    }

    pub fn window_start_time(&self, clock: &dyn Clock) -> i64 {
        self.current_window_start(clock)
    }
}

/// A sliding time window divided into explicit periods. The window always
/// trails the current instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindow {
    window_millis: i64,
    period_millis: i64,
    window_str: String,
}

impl SlidingWindow {
    /// Create from window and period duration strings. The period must
    /// evenly divide the window.
    pub fn new(window: &str, period: &str) -> Result<Self> {
        let window_millis = parse_duration(window)?;
        let period_millis = parse_duration(period)?;
        if window_millis % period_millis != 0 {
            return Err(AggregationError::NonDivisiblePeriod {
                window: window.to_string(),
                window_millis,
                period_millis,
            });
        }
        Ok(Self {
            window_millis,
            period_millis,
            window_str: window.to_string(),
        })
    }

    pub fn window_millis(&self) -> i64 {
        self.window_millis
    }

    pub fn period_millis(&self) -> i64 {
        self.period_millis
    }

    pub fn label(&self) -> &str {
        &self.window_str
    }

    pub fn total_buckets(&self) -> i64 {
        self.window_millis / self.period_millis
    }

    /// Sliding windows always end at the query instant.
    pub fn window_start_time(&self, clock: &dyn Clock) -> i64 {
        clock.now_millis()
    }
}

// ============================================================================
// Window sets
// ============================================================================

/// Contract a window set exposes to the per-key accumulator step.
///
/// The accumulator uses these to compute which bucket slot an event's
/// timestamp falls into and how many trailing buckets constitute each
/// declared window.
pub trait WindowSet {
    /// Member windows as `(length_millis, label)` pairs, ascending by
    /// length, without duplicate lengths.
    fn windows(&self) -> &[(i64, String)];

    /// The shared period all member windows are subdivided into.
    fn period_millis(&self) -> i64;

    /// LCM of all member window lengths: the smallest span one bucket
    /// array can serve for every window at once.
    fn combined_window_millis(&self) -> i64;

    /// Size of the combined bucket array.
    fn total_buckets(&self) -> i64;

    fn max_window_millis(&self) -> i64;

    fn min_window_millis(&self) -> i64;

    /// Start of the period containing `timestamp`.
    fn period_start(&self, timestamp: i64) -> i64 {
        floor_to(timestamp, self.period_millis())
    }

    /// Bucket slot for `timestamp` in the combined circular array.
    fn period_index(&self, timestamp: i64) -> usize {
        ((timestamp / self.period_millis()) % self.total_buckets()) as usize
    }
}

/// State shared by both window-set flavours. Windows are kept sorted
/// ascending by length with no duplicate lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WindowSetBase {
    windows: Vec<(i64, String)>,
    period_millis: i64,
    combined_window_millis: i64,
    total_buckets: i64,
    max_window_millis: i64,
    min_window_millis: i64,
}

impl WindowSetBase {
    fn new(period_millis: i64, windows: Vec<(i64, String)>) -> Self {
        let combined_window_millis = windows
            .iter()
            .fold(1, |acc, (length, _)| lcm(acc, *length));
        Self {
            max_window_millis: windows[windows.len() - 1].0,
            min_window_millis: windows[0].0,
            total_buckets: combined_window_millis / period_millis,
            combined_window_millis,
            period_millis,
            windows,
        }
    }
}

/// Sort pairs ascending by length and drop duplicate lengths, keeping the
/// first label seen for each length. Rejects an empty list.
fn normalize_pairs(mut pairs: Vec<(i64, String)>) -> Result<Vec<(i64, String)>> {
    if pairs.is_empty() {
        return Err(AggregationError::EmptyWindowList);
    }
    pairs.sort_by_key(|(length, _)| *length);
    pairs.dedup_by_key(|(length, _)| *length);
    Ok(pairs)
}

fn parse_window_pairs<S: AsRef<str>>(windows: &[S]) -> Result<Vec<(i64, String)>> {
    let mut pairs = Vec::with_capacity(windows.len());
    for window in windows {
        let label = window.as_ref();
        pairs.push((parse_duration(label)?, label.to_string()));
    }
    normalize_pairs(pairs)
}

/// Derived period: GCD of every window length and one calendar unit of
/// the smallest window, split into [`BUCKETS_PER_WINDOW`] buckets. Folding
/// in the smallest window's unit pins the rounding granularity to its
/// calendar unit, so `["1h"]` and `["2h"]` derive the same period.
fn derive_period_millis(pairs: &[(i64, String)]) -> Result<i64> {
    let smallest_unit = one_unit_of_duration(&pairs[0].1)?;
    let common = pairs
        .iter()
        .fold(smallest_unit, |acc, (length, _)| gcd(acc, *length));
    Ok(common / BUCKETS_PER_WINDOW)
}

/// A set of calendar-aligned windows sharing one derived period and one
/// combined bucket array. `["1h", "2h"]` represents 1h and 2h windows
/// starting on the round hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWindows {
    base: WindowSetBase,
    smallest_window_unit_millis: i64,
}

impl FixedWindows {
    /// Create from duration strings in the format `[0-9]+[smhd]`.
    pub fn new<S: AsRef<str>>(windows: &[S]) -> Result<Self> {
        Self::from_pairs(parse_window_pairs(windows)?)
    }

    /// Create from pre-parsed `(length_millis, label)` pairs.
    pub fn from_pairs(pairs: Vec<(i64, String)>) -> Result<Self> {
        let pairs = normalize_pairs(pairs)?;
        let period_millis = derive_period_millis(&pairs)?;
        Self::with_period(period_millis, pairs)
    }

    fn with_period(period_millis: i64, pairs: Vec<(i64, String)>) -> Result<Self> {
        let smallest_window_unit_millis = one_unit_of_duration(&pairs[0].1)?;
        Ok(Self {
            base: WindowSetBase::new(period_millis, pairs),
            smallest_window_unit_millis,
        })
    }

    /// Round a timestamp up to the next boundary of the smallest window's
    /// calendar unit.
    pub fn round_up_time_to_window(&self, timestamp: i64) -> i64 {
        floor_to(timestamp, self.smallest_window_unit_millis) + self.smallest_window_unit_millis
    }

    /// Start of the combined window span containing `timestamp`.
    pub fn window_start_time(&self, timestamp: i64) -> i64 {
        floor_to(timestamp, self.base.combined_window_millis)
    }

    /// Widening merge: the sorted, deduplicated union of both sets'
    /// windows under the shared period, with the combined span, bucket
    /// count, and max/min recomputed from the union. Returns a new set;
    /// neither input is modified.
    ///
    /// Fails when the two sets do not share a period: window requests can
    /// only share a bucket array if their periods are identical.
    pub fn merge(&self, other: &FixedWindows) -> Result<FixedWindows> {
        let pairs = merged_pairs(&self.base, &other.base)?;
        Self::with_period(self.base.period_millis, pairs)
    }
}

impl WindowSet for FixedWindows {
    fn windows(&self) -> &[(i64, String)] {
        &self.base.windows
    }

    fn period_millis(&self) -> i64 {
        self.base.period_millis
    }

    fn combined_window_millis(&self) -> i64 {
        self.base.combined_window_millis
    }

    fn total_buckets(&self) -> i64 {
        self.base.total_buckets
    }

    fn max_window_millis(&self) -> i64 {
        self.base.max_window_millis
    }

    fn min_window_millis(&self) -> i64 {
        self.base.min_window_millis
    }
}

/// A set of sliding windows sharing one period and one combined bucket
/// array. `["1h", "2h"]` represents 1h and 2h windows trailing the
/// current instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindows {
    base: WindowSetBase,
}

impl SlidingWindows {
    /// Create from duration strings, with an optional explicit period.
    ///
    /// A supplied period must evenly divide every window; without one the
    /// period is derived from the smallest window the same way as for
    /// fixed sets.
    pub fn new<S: AsRef<str>>(windows: &[S], period: Option<&str>) -> Result<Self> {
        Self::from_pairs(parse_window_pairs(windows)?, period)
    }

    /// Create from pre-parsed `(length_millis, label)` pairs.
    pub fn from_pairs(pairs: Vec<(i64, String)>, period: Option<&str>) -> Result<Self> {
        let pairs = normalize_pairs(pairs)?;
        let period_millis = match period {
            Some(period) => {
                let period_millis = parse_duration(period)?;
                for (window_millis, label) in &pairs {
                    if window_millis % period_millis != 0 {
                        return Err(AggregationError::NonDivisiblePeriod {
                            window: label.clone(),
                            window_millis: *window_millis,
                            period_millis,
                        });
                    }
                }
                period_millis
            }
            None => derive_period_millis(&pairs)?,
        };
        Ok(Self {
            base: WindowSetBase::new(period_millis, pairs),
        })
    }

    /// Start of the period containing `timestamp`; sliding windows align
    /// to period boundaries rather than whole-window boundaries.
    pub fn window_start_time(&self, timestamp: i64) -> i64 {
        floor_to(timestamp, self.base.period_millis)
    }

    /// Widening merge, same contract as [`FixedWindows::merge`].
    pub fn merge(&self, other: &SlidingWindows) -> Result<SlidingWindows> {
        let pairs = merged_pairs(&self.base, &other.base)?;
        Ok(Self {
            base: WindowSetBase::new(self.base.period_millis, pairs),
        })
    }
}

impl WindowSet for SlidingWindows {
    fn windows(&self) -> &[(i64, String)] {
        &self.base.windows
    }

    fn period_millis(&self) -> i64 {
        self.base.period_millis
    }

    fn combined_window_millis(&self) -> i64 {
        self.base.combined_window_millis
    }

    fn total_buckets(&self) -> i64 {
        self.base.total_buckets
    }

    fn max_window_millis(&self) -> i64 {
        self.base.max_window_millis
    }

    fn min_window_millis(&self) -> i64 {
        self.base.min_window_millis
    }
}

fn merged_pairs(left: &WindowSetBase, right: &WindowSetBase) -> Result<Vec<(i64, String)>> {
    if left.period_millis != right.period_millis {
        return Err(AggregationError::IncompatiblePeriods {
            left_millis: left.period_millis,
            right_millis: right.period_millis,
        });
    }
    let mut pairs = left.windows.clone();
    for window in &right.windows {
        if !pairs.iter().any(|(length, _)| *length == window.0) {
            pairs.push(window.clone());
        }
    }
    normalize_pairs(pairs)
}

/// Either flavour of window set, as bound to a field aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Windows {
    Fixed(FixedWindows),
    Sliding(SlidingWindows),
}

impl Windows {
    pub fn period_millis(&self) -> i64 {
        self.as_window_set().period_millis()
    }

    pub fn total_buckets(&self) -> i64 {
        self.as_window_set().total_buckets()
    }

    pub fn combined_window_millis(&self) -> i64 {
        self.as_window_set().combined_window_millis()
    }

    pub fn max_window_millis(&self) -> i64 {
        self.as_window_set().max_window_millis()
    }

    pub fn min_window_millis(&self) -> i64 {
        self.as_window_set().min_window_millis()
    }

    pub fn as_window_set(&self) -> &dyn WindowSet {
        match self {
            Windows::Fixed(set) => set,
            Windows::Sliding(set) => set,
        }
    }

    /// Merge two window sets of the same flavour. Mixing fixed and
    /// sliding sets is rejected, never coerced.
    pub fn merge(&self, other: &Windows) -> Result<Windows> {
        match (self, other) {
            (Windows::Fixed(a), Windows::Fixed(b)) => Ok(Windows::Fixed(a.merge(b)?)),
            (Windows::Sliding(a), Windows::Sliding(b)) => Ok(Windows::Sliding(a.merge(b)?)),
            _ => Err(AggregationError::MismatchedWindowKinds),
        }
    }
}

impl From<FixedWindows> for Windows {
    fn from(set: FixedWindows) -> Self {
        Windows::Fixed(set)
    }
}

impl From<SlidingWindows> for Windows {
    fn from(set: SlidingWindows) -> Self {
        Windows::Sliding(set)
    }
}
