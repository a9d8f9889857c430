//! Emit policies
//!
//! An emit policy is the rule telling the downstream emission scheduler
//! when accumulated aggregate state may (or must) be flushed. The policy
//! itself enforces nothing at runtime; settings like
//! `AfterMaxEvent::timeout_seconds` are values the scheduler consumes.
//!
//! Policies are parsed from a configuration mapping with a required
//! `mode` discriminator. Parsing is strict: each mode validates its own
//! required fields, and any leftover keys are a validation failure.

use crate::error::{AggregationError, Result};
use freshet_core::Value;
use std::collections::{HashMap, HashSet};

/// Whether emission carries all results or only the delta since the last
/// emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmissionType {
    #[default]
    All,
    Incremental,
}

/// The closed set of flush triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTrigger {
    /// Emit after every processed event
    EveryEvent,
    /// Emit once per completed period, delayed to allow late data
    AfterPeriod { delay_seconds: u64 },
    /// Emit once per completed window, delayed to allow late data
    AfterWindow { delay_seconds: u64 },
    /// Emit every `max_events`-th event, or when `timeout_seconds`
    /// elapses without reaching the count, whichever comes first
    AfterMaxEvent {
        max_events: u64,
        timeout_seconds: Option<u64>,
    },
    /// Emit a fixed delay after the triggering event
    AfterDelay { delay_seconds: u64 },
}

impl EmitTrigger {
    /// The `mode` discriminator used in configuration mappings.
    pub fn mode(&self) -> &'static str {
        match self {
            EmitTrigger::EveryEvent => "everyEvent",
            EmitTrigger::AfterPeriod { .. } => "afterPeriod",
            EmitTrigger::AfterWindow { .. } => "afterWindow",
            EmitTrigger::AfterMaxEvent { .. } => "maxEvents",
            EmitTrigger::AfterDelay { .. } => "afterDelay",
        }
    }
}

/// Rule governing when aggregated state is flushed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitPolicy {
    pub trigger: EmitTrigger,
    pub emission_type: EmissionType,
}

impl EmitPolicy {
    /// Validate and wrap a trigger with the default emission type.
    pub fn new(trigger: EmitTrigger) -> Result<Self> {
        if let EmitTrigger::AfterMaxEvent { max_events, .. } = trigger {
            if max_events < 1 {
                return Err(AggregationError::InvalidEmitParameter {
                    parameter: "maxEvents".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(Self {
            trigger,
            emission_type: EmissionType::default(),
        })
    }

    pub fn every_event() -> Self {
        Self {
            trigger: EmitTrigger::EveryEvent,
            emission_type: EmissionType::default(),
        }
    }

    pub fn after_period(delay_seconds: u64) -> Self {
        Self {
            trigger: EmitTrigger::AfterPeriod { delay_seconds },
            emission_type: EmissionType::default(),
        }
    }

    pub fn after_window(delay_seconds: u64) -> Self {
        Self {
            trigger: EmitTrigger::AfterWindow { delay_seconds },
            emission_type: EmissionType::default(),
        }
    }

    pub fn after_max_event(max_events: u64, timeout_seconds: Option<u64>) -> Result<Self> {
        Self::new(EmitTrigger::AfterMaxEvent {
            max_events,
            timeout_seconds,
        })
    }

    pub fn after_delay(delay_seconds: u64) -> Self {
        Self {
            trigger: EmitTrigger::AfterDelay { delay_seconds },
            emission_type: EmissionType::default(),
        }
    }

    pub fn with_emission_type(mut self, emission_type: EmissionType) -> Self {
        self.emission_type = emission_type;
        self
    }

    /// Parse a policy from a configuration mapping.
    ///
    /// The mapping must carry a `mode` key naming one of `everyEvent`,
    /// `maxEvents`, `afterDelay`, `afterWindow`, or `afterPeriod`; each
    /// mode consumes its own fields, and leftover keys fail with
    /// [`AggregationError::UnexpectedEmitParameter`]. The emission type
    /// is not part of the wire mapping and always parses as `All`.
    pub fn from_config(config: &HashMap<String, Value>) -> Result<Self> {
        let mode_value = config
            .get("mode")
            .ok_or_else(|| AggregationError::MissingEmitParameter {
                parameter: "mode".to_string(),
            })?;
        let mode = mode_value
            .as_str()
            .ok_or_else(|| AggregationError::UnsupportedEmitMode(format!("{mode_value:?}")))?;

        let mut consumed: HashSet<&str> = HashSet::from(["mode"]);
        let policy = match mode {
            "everyEvent" => EmitPolicy::every_event(),
            "maxEvents" => {
                let max_events = require_u64(config, "maxEvents")?;
                let timeout_seconds = optional_u64(config, "timeout")?;
                consumed.insert("maxEvents");
                consumed.insert("timeout");
                EmitPolicy::after_max_event(max_events, timeout_seconds)?
            }
            "afterDelay" => {
                let delay_seconds = require_u64(config, "delay")?;
                consumed.insert("delay");
                EmitPolicy::after_delay(delay_seconds)
            }
            "afterWindow" => {
                let delay_seconds = optional_u64(config, "delay")?.unwrap_or(0);
                consumed.insert("delay");
                EmitPolicy::after_window(delay_seconds)
            }
            "afterPeriod" => {
                let delay_seconds = optional_u64(config, "delay")?.unwrap_or(0);
                consumed.insert("delay");
                EmitPolicy::after_period(delay_seconds)
            }
            other => return Err(AggregationError::UnsupportedEmitMode(other.to_string())),
        };

        let mut leftovers: Vec<String> = config
            .keys()
            .filter(|key| !consumed.contains(key.as_str()))
            .cloned()
            .collect();
        if !leftovers.is_empty() {
            leftovers.sort();
            return Err(AggregationError::UnexpectedEmitParameter {
                parameters: leftovers,
            });
        }

        Ok(policy)
    }

    /// Serialize the trigger to its configuration mapping. Only keys the
    /// mode consumes are emitted, so `from_config(to_config())` round
    /// trips exactly.
    pub fn to_config(&self) -> HashMap<String, Value> {
        let mut config = HashMap::new();
        config.insert("mode".to_string(), Value::from(self.trigger.mode()));
        match &self.trigger {
            EmitTrigger::EveryEvent => {}
            EmitTrigger::AfterPeriod { delay_seconds }
            | EmitTrigger::AfterWindow { delay_seconds }
            | EmitTrigger::AfterDelay { delay_seconds } => {
                config.insert("delay".to_string(), Value::from(*delay_seconds));
            }
            EmitTrigger::AfterMaxEvent {
                max_events,
                timeout_seconds,
            } => {
                config.insert("maxEvents".to_string(), Value::from(*max_events));
                if let Some(timeout) = timeout_seconds {
                    config.insert("timeout".to_string(), Value::from(*timeout));
                }
            }
        }
        config
    }
}

fn require_u64(config: &HashMap<String, Value>, parameter: &str) -> Result<u64> {
    optional_u64(config, parameter)?.ok_or_else(|| AggregationError::MissingEmitParameter {
        parameter: parameter.to_string(),
    })
}

fn optional_u64(config: &HashMap<String, Value>, parameter: &str) -> Result<Option<u64>> {
    match config.get(parameter) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| AggregationError::InvalidEmitParameter {
                parameter: parameter.to_string(),
                reason: format!("expected a non-negative integer, got {value:?}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_every_mode_round_trips() {
        let policies = [
            EmitPolicy::every_event(),
            EmitPolicy::after_period(5),
            EmitPolicy::after_window(0),
            EmitPolicy::after_max_event(100, Some(30)).unwrap(),
            EmitPolicy::after_max_event(1, None).unwrap(),
            EmitPolicy::after_delay(15),
        ];
        for policy in policies {
            let parsed = EmitPolicy::from_config(&policy.to_config()).unwrap();
            assert_eq!(parsed, policy);
        }
    }

    #[test]
    fn test_missing_mode_fails() {
        let err = EmitPolicy::from_config(&config(&[])).unwrap_err();
        assert_eq!(
            err,
            AggregationError::MissingEmitParameter {
                parameter: "mode".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_mode_names_the_value() {
        let err =
            EmitPolicy::from_config(&config(&[("mode", Value::from("onCommit"))])).unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnsupportedEmitMode("onCommit".to_string())
        );
    }

    #[test]
    fn test_max_events_requires_count() {
        let err =
            EmitPolicy::from_config(&config(&[("mode", Value::from("maxEvents"))])).unwrap_err();
        assert_eq!(
            err,
            AggregationError::MissingEmitParameter {
                parameter: "maxEvents".to_string()
            }
        );
    }

    #[test]
    fn test_after_delay_requires_delay() {
        let err =
            EmitPolicy::from_config(&config(&[("mode", Value::from("afterDelay"))])).unwrap_err();
        assert_eq!(
            err,
            AggregationError::MissingEmitParameter {
                parameter: "delay".to_string()
            }
        );
    }

    #[test]
    fn test_window_and_period_delay_defaults_to_zero() {
        let policy =
            EmitPolicy::from_config(&config(&[("mode", Value::from("afterWindow"))])).unwrap();
        assert_eq!(policy.trigger, EmitTrigger::AfterWindow { delay_seconds: 0 });

        let policy = EmitPolicy::from_config(&config(&[
            ("mode", Value::from("afterPeriod")),
            ("delay", Value::from(10_u64)),
        ]))
        .unwrap();
        assert_eq!(
            policy.trigger,
            EmitTrigger::AfterPeriod { delay_seconds: 10 }
        );
    }

    #[test]
    fn test_leftover_keys_are_rejected() {
        let err = EmitPolicy::from_config(&config(&[
            ("mode", Value::from("everyEvent")),
            ("delay", Value::from(3_u64)),
            ("batch", Value::from(true)),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnexpectedEmitParameter {
                parameters: vec!["batch".to_string(), "delay".to_string()]
            }
        );
    }

    #[test]
    fn test_invalid_parameter_values_are_rejected() {
        let err = EmitPolicy::from_config(&config(&[
            ("mode", Value::from("maxEvents")),
            ("maxEvents", Value::from(-5_i64)),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            AggregationError::InvalidEmitParameter { .. }
        ));

        let err = EmitPolicy::after_max_event(0, None).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::InvalidEmitParameter { .. }
        ));
    }

    #[test]
    fn test_emission_type_defaults_to_all() {
        let policy = EmitPolicy::every_event();
        assert_eq!(policy.emission_type, EmissionType::All);

        let incremental = policy.with_emission_type(EmissionType::Incremental);
        assert_eq!(incremental.emission_type, EmissionType::Incremental);
    }
}
