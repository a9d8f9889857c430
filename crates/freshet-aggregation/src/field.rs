//! Field aggregators
//!
//! A [`FieldAggregator`] declares one feature: a value extracted from
//! each event, the named aggregates to maintain over it, the windows to
//! maintain them in, and an optional filter and value clamp. It carries
//! configuration only; the per-key accumulator step does the arithmetic.

use crate::aggregate::{all_raw_aggregates, Aggregate, RawAggregate};
use crate::error::Result;
use crate::window::Windows;
use freshet_core::{Event, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether an event participates in a feature.
pub type EventFilter = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Caller-supplied extraction function.
pub type ExtractorFn = Arc<dyn Fn(&Event) -> Value + Send + Sync>;

/// How the aggregated value is obtained from an event: a field lookup on
/// the event body, or an arbitrary function of the event.
#[derive(Clone)]
pub enum ValueExtractor {
    Field(String),
    Custom(ExtractorFn),
}

impl ValueExtractor {
    pub fn field(name: impl Into<String>) -> Self {
        ValueExtractor::Field(name.into())
    }

    pub fn custom(extract: impl Fn(&Event) -> Value + Send + Sync + 'static) -> Self {
        ValueExtractor::Custom(Arc::new(extract))
    }

    /// Extract the value for one event. A field lookup tolerates absent
    /// fields and non-object bodies, yielding `Value::Null`.
    pub fn extract(&self, event: &Event) -> Value {
        match self {
            ValueExtractor::Field(name) => {
                event.body.get(name).cloned().unwrap_or(Value::Null)
            }
            ValueExtractor::Custom(extract) => extract(event),
        }
    }
}

impl fmt::Debug for ValueExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExtractor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            ValueExtractor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for ValueExtractor {
    fn from(field: &str) -> Self {
        ValueExtractor::Field(field.to_string())
    }
}

impl From<String> for ValueExtractor {
    fn from(field: String) -> Self {
        ValueExtractor::Field(field)
    }
}

/// One declared feature: a named set of aggregations over a value
/// extracted from events, maintained across a window set.
#[derive(Clone)]
pub struct FieldAggregator {
    name: String,
    extractor: ValueExtractor,
    aggregates: Vec<Aggregate>,
    windows: Windows,
    filter: Option<EventFilter>,
    max_value: Option<f64>,
}

impl FieldAggregator {
    /// Bind a feature name, an extractor, the requested aggregate names,
    /// and a window set.
    ///
    /// Every aggregate name is validated against the catalogue here;
    /// an unknown name fails the whole construction and no aggregator
    /// is produced. Duplicate names are collapsed, preserving request
    /// order.
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        extractor: impl Into<ValueExtractor>,
        aggregates: impl IntoIterator<Item = S>,
        windows: Windows,
    ) -> Result<Self> {
        let mut parsed: Vec<Aggregate> = Vec::new();
        for aggregate in aggregates {
            let aggregate: Aggregate = aggregate.as_ref().parse()?;
            if !parsed.contains(&aggregate) {
                parsed.push(aggregate);
            }
        }
        Ok(Self {
            name: name.into(),
            extractor: extractor.into(),
            aggregates: parsed,
            windows,
            filter: None,
            max_value: None,
        })
    }

    /// Restrict aggregation to events the filter accepts.
    pub fn with_filter(mut self, filter: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Clamp aggregated values to a maximum.
    pub fn with_max_value(mut self, max_value: f64) -> Self {
        self.max_value = Some(max_value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn windows(&self) -> &Windows {
        &self.windows
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// Whether this event participates in the feature: `true` when no
    /// filter is set, otherwise exactly the filter's result. Pure.
    pub fn should_aggregate(&self, event: &Event) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => filter(event),
        }
    }

    /// Extract the value to aggregate from one event.
    pub fn extract_value(&self, event: &Event) -> Value {
        self.extractor.extract(event)
    }

    /// The minimal set of raw accumulators the downstream step must
    /// maintain to serve every requested aggregate.
    pub fn raw_aggregates(&self) -> BTreeSet<RawAggregate> {
        all_raw_aggregates(&self.aggregates)
    }
}

impl fmt::Debug for FieldAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAggregator")
            .field("name", &self.name)
            .field("extractor", &self.extractor)
            .field("aggregates", &self.aggregates)
            .field("windows", &self.windows)
            .field("filter", &self.filter.is_some())
            .field("max_value", &self.max_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AggregationError;
    use crate::window::SlidingWindows;
    use std::collections::HashMap;

    fn sample_windows() -> Windows {
        SlidingWindows::new(&["1h", "2h"], Some("10m")).unwrap().into()
    }

    fn purchase(amount: f64) -> Event {
        let mut body = HashMap::new();
        body.insert("amount".to_string(), Value::Number(amount));
        Event::new(Value::Object(body)).with_key("user-1")
    }

    #[test]
    fn test_should_aggregate_without_filter() {
        let aggregator =
            FieldAggregator::new("total_spend", "amount", ["sum"], sample_windows()).unwrap();
        assert!(aggregator.should_aggregate(&purchase(10.0)));
        assert!(aggregator.should_aggregate(&purchase(-3.0)));
    }

    #[test]
    fn test_should_aggregate_mirrors_filter() {
        let aggregator =
            FieldAggregator::new("big_spend", "amount", ["sum"], sample_windows())
                .unwrap()
                .with_filter(|event| {
                    event
                        .body
                        .get("amount")
                        .and_then(Value::as_f64)
                        .map(|amount| amount > 100.0)
                        .unwrap_or(false)
                });

        assert!(aggregator.should_aggregate(&purchase(250.0)));
        assert!(!aggregator.should_aggregate(&purchase(10.0)));
        assert!(!aggregator.should_aggregate(&Event::new(Value::Null)));
    }

    #[test]
    fn test_field_extraction_tolerates_absence() {
        let aggregator =
            FieldAggregator::new("total_spend", "amount", ["sum"], sample_windows()).unwrap();

        assert_eq!(aggregator.extract_value(&purchase(12.5)), Value::Number(12.5));
        assert_eq!(aggregator.extract_value(&Event::new(Value::Null)), Value::Null);

        let other = Event::new(Value::Object(HashMap::new()));
        assert_eq!(aggregator.extract_value(&other), Value::Null);
    }

    #[test]
    fn test_custom_extractor() {
        let aggregator = FieldAggregator::new(
            "path_length",
            ValueExtractor::custom(|event| Value::from(event.path.len() as i64)),
            ["max"],
            sample_windows(),
        )
        .unwrap();

        let event = Event::new(Value::Null).with_path("/orders/42");
        assert_eq!(aggregator.extract_value(&event), Value::Number(10.0));
    }

    #[test]
    fn test_unknown_aggregate_fails_construction() {
        let err = FieldAggregator::new(
            "bad",
            "amount",
            ["sum", "median"],
            sample_windows(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnsupportedAggregate("median".to_string())
        );
    }

    #[test]
    fn test_duplicate_aggregates_collapse_in_order() {
        let aggregator = FieldAggregator::new(
            "spend",
            "amount",
            ["avg", "sum", "avg"],
            sample_windows(),
        )
        .unwrap();
        assert_eq!(aggregator.aggregates(), &[Aggregate::Avg, Aggregate::Sum]);
    }

    #[test]
    fn test_raw_aggregates_expand() {
        let aggregator = FieldAggregator::new(
            "spend",
            "amount",
            ["avg", "stddev"],
            sample_windows(),
        )
        .unwrap();
        let raw: Vec<RawAggregate> = aggregator.raw_aggregates().into_iter().collect();
        assert_eq!(
            raw,
            vec![RawAggregate::Count, RawAggregate::Sum, RawAggregate::Sqr]
        );
    }

    #[test]
    fn test_max_value_clamp_is_recorded() {
        let aggregator =
            FieldAggregator::new("spend", "amount", ["sum"], sample_windows())
                .unwrap()
                .with_max_value(1_000.0);
        assert_eq!(aggregator.max_value(), Some(1_000.0));
    }
}
