//! Feature registry
//!
//! Loads declarative feature definitions from YAML configuration files
//! and builds validated [`FieldAggregator`]s from them. Feature names
//! must be unique across everything a registry has loaded; duplicate
//! names are a load error, never a silent overwrite.

use crate::emit::EmitPolicy;
use crate::error::Result as AggregationResult;
use crate::field::FieldAggregator;
use crate::window::{FixedWindows, SlidingWindows, Windows};
use anyhow::{Context, Result};
use freshet_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Window-set configuration, dispatched on the `kind` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum WindowsConfig {
    /// Calendar-aligned windows; the period is always derived
    Fixed { windows: Vec<String> },
    /// Now-relative windows, with an optional explicit period
    Sliding {
        windows: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<String>,
    },
}

impl WindowsConfig {
    pub fn build(&self) -> AggregationResult<Windows> {
        match self {
            WindowsConfig::Fixed { windows } => {
                Ok(Windows::Fixed(FixedWindows::new(windows)?))
            }
            WindowsConfig::Sliding { windows, period } => Ok(Windows::Sliding(
                SlidingWindows::new(windows, period.as_deref())?,
            )),
        }
    }
}

/// One feature definition as loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldAggregatorConfig {
    /// Feature name (unique identifier)
    pub name: String,

    /// Field in the event body to aggregate
    pub field: String,

    /// Aggregates to apply, e.g. `["sum", "avg"]`
    pub aggregations: Vec<String>,

    /// Time windows to aggregate the data by
    pub windows: WindowsConfig,

    /// Maximum value for the aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    /// Emit policy mapping (see [`EmitPolicy::from_config`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<HashMap<String, Value>>,
}

impl FieldAggregatorConfig {
    /// Build the validated aggregator this configuration describes.
    pub fn build(&self) -> AggregationResult<FieldAggregator> {
        let windows = self.windows.build()?;
        let mut aggregator =
            FieldAggregator::new(&self.name, self.field.as_str(), &self.aggregations, windows)?;
        if let Some(max_value) = self.max_value {
            aggregator = aggregator.with_max_value(max_value);
        }
        Ok(aggregator)
    }

    /// Parse the emit policy mapping, if one is configured.
    pub fn emit_policy(&self) -> AggregationResult<Option<EmitPolicy>> {
        self.emit.as_ref().map(EmitPolicy::from_config).transpose()
    }
}

/// Feature collection loaded from one YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// List of feature definitions
    pub features: Vec<FieldAggregatorConfig>,

    /// Optional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl FeatureCollection {
    /// Validate every definition in the collection: unique names, and
    /// each definition must build cleanly.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut names = std::collections::HashSet::new();
        for feature in &self.features {
            if !names.insert(&feature.name) {
                return Err(format!("Duplicate feature name: {}", feature.name));
            }
        }

        for feature in &self.features {
            feature
                .build()
                .map_err(|e| format!("Feature '{}': {}", feature.name, e))?;
            feature
                .emit_policy()
                .map_err(|e| format!("Feature '{}': {}", feature.name, e))?;
        }

        Ok(())
    }
}

/// Registry of validated field aggregators, indexed by feature name.
pub struct FeatureRegistry {
    aggregators: HashMap<String, FieldAggregator>,
    configs: HashMap<String, FieldAggregatorConfig>,
}

impl FeatureRegistry {
    /// Create a new empty feature registry
    pub fn new() -> Self {
        Self {
            aggregators: HashMap::new(),
            configs: HashMap::new(),
        }
    }

    /// Register every feature in a collection.
    pub fn register_collection(&mut self, collection: FeatureCollection) -> Result<()> {
        collection
            .validate()
            .map_err(|e| anyhow::anyhow!("Feature validation failed: {}", e))?;

        for config in &collection.features {
            if self.configs.contains_key(&config.name) {
                return Err(anyhow::anyhow!(
                    "Duplicate feature name across collections: {}",
                    config.name
                ));
            }
        }

        for config in collection.features {
            let aggregator = config
                .build()
                .map_err(|e| anyhow::anyhow!("Feature '{}': {}", config.name, e))?;
            self.aggregators.insert(config.name.clone(), aggregator);
            self.configs.insert(config.name.clone(), config);
        }

        Ok(())
    }

    /// Load features from a single YAML file
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("Loading features from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature file: {}", path.display()))?;

        let collection: FeatureCollection = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse feature file: {}", path.display()))?;

        let count = collection.features.len();
        self.register_collection(collection)
            .with_context(|| format!("Invalid feature file: {}", path.display()))?;

        info!("Loaded {} features from: {}", count, path.display());
        Ok(())
    }

    /// Load features from a directory (all .yaml and .yml files)
    pub fn load_from_directory(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        info!("Loading features from directory: {}", dir.display());

        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Not a directory: {}", dir.display()));
        }

        let mut loaded_count = 0;
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == "yaml" || ext == "yml" {
                        self.load_from_file(&path)?;
                        loaded_count += 1;
                    }
                }
            }
        }

        if loaded_count == 0 {
            warn!("No feature files found in: {}", dir.display());
        }
        Ok(())
    }

    /// Get a built aggregator by feature name
    pub fn get(&self, name: &str) -> Option<&FieldAggregator> {
        self.aggregators.get(name)
    }

    /// Get the raw configuration a feature was built from
    pub fn get_config(&self, name: &str) -> Option<&FieldAggregatorConfig> {
        self.configs.get(name)
    }

    /// All registered aggregators
    pub fn all(&self) -> impl Iterator<Item = &FieldAggregator> {
        self.aggregators.values()
    }

    /// All feature names, sorted for stable iteration
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aggregators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a feature exists
    pub fn contains(&self, name: &str) -> bool {
        self.aggregators.contains_key(name)
    }

    /// Count of registered features
    pub fn count(&self) -> usize {
        self.aggregators.len()
    }

    /// Clear all registered features
    pub fn clear(&mut self) {
        self.aggregators.clear();
        self.configs.clear();
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use std::io::Write;

    const FEATURES_YAML: &str = r#"
features:
  - name: total_spend_1h
    field: amount
    aggregations: [sum, avg]
    windows:
      kind: sliding
      windows: ["1h", "2h"]
      period: 30m
    max_value: 100000
  - name: login_count
    field: login
    aggregations: [count]
    windows:
      kind: fixed
      windows: ["1h", "6h"]
    emit:
      mode: afterPeriod
      delay: 5
metadata:
  team: risk
"#;

    #[test]
    fn test_collection_parses_and_builds() {
        let collection: FeatureCollection = serde_yaml::from_str(FEATURES_YAML).unwrap();
        assert!(collection.validate().is_ok());
        assert_eq!(collection.features.len(), 2);

        let spend = collection.features[0].build().unwrap();
        assert_eq!(spend.name(), "total_spend_1h");
        assert_eq!(spend.aggregates(), &[Aggregate::Sum, Aggregate::Avg]);
        assert_eq!(spend.max_value(), Some(100_000.0));
        assert_eq!(spend.windows().period_millis(), 30 * 60_000);

        let emit = collection.features[1].emit_policy().unwrap().unwrap();
        assert_eq!(emit, EmitPolicy::after_period(5));
    }

    #[test]
    fn test_duplicate_names_fail_validation() {
        let mut collection: FeatureCollection = serde_yaml::from_str(FEATURES_YAML).unwrap();
        collection.features[1].name = "total_spend_1h".to_string();

        let err = collection.validate().unwrap_err();
        assert!(err.contains("Duplicate feature name"));
    }

    #[test]
    fn test_invalid_aggregate_fails_validation() {
        let mut collection: FeatureCollection = serde_yaml::from_str(FEATURES_YAML).unwrap();
        collection.features[0]
            .aggregations
            .push("median".to_string());

        let err = collection.validate().unwrap_err();
        assert!(err.contains("median"));
    }

    #[test]
    fn test_registry_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(FEATURES_YAML.as_bytes()).unwrap();

        let mut registry = FeatureRegistry::new();
        registry.load_from_file(file.path()).unwrap();

        assert_eq!(registry.count(), 2);
        assert!(registry.contains("login_count"));
        assert_eq!(
            registry.feature_names(),
            vec!["login_count".to_string(), "total_spend_1h".to_string()]
        );
        assert!(registry.get("total_spend_1h").is_some());
        assert!(registry.get_config("login_count").is_some());
    }

    #[test]
    fn test_registry_rejects_cross_file_duplicates() {
        let collection: FeatureCollection = serde_yaml::from_str(FEATURES_YAML).unwrap();
        let mut registry = FeatureRegistry::new();
        registry.register_collection(collection.clone()).unwrap();

        let err = registry.register_collection(collection).unwrap_err();
        assert!(err.to_string().contains("Duplicate feature name"));
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let collection: FeatureCollection = serde_yaml::from_str(FEATURES_YAML).unwrap();
        let serialized = serde_yaml::to_string(&collection).unwrap();
        let reparsed: FeatureCollection = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.features[0].name, collection.features[0].name);
        assert_eq!(reparsed.features[1].windows, collection.features[1].windows);
    }
}
