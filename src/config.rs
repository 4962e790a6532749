// Copyright 2025 Cowboy AI, LLC.

//! Index configuration

use serde::{Deserialize, Serialize};

/// Tunable settings for the cross-reference index. Loading these from files
/// or the environment is a deployment concern; the core takes the value
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    /// Name of the aggregation-record collection
    pub aggregation_collection: String,
    /// Depth bound for automatic route derivation
    pub max_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            aggregation_collection: "aggregations".to_string(),
            max_depth: 6,
        }
    }
}

impl IndexConfig {
    /// Override the aggregation collection name.
    pub fn with_aggregation_collection(mut self, name: impl Into<String>) -> Self {
        self.aggregation_collection = name.into();
        self
    }

    /// Override the route-derivation depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = IndexConfig::default();
        assert_eq!(config.aggregation_collection, "aggregations");
        assert_eq!(config.max_depth, 6);

        let config = config
            .with_aggregation_collection("xref")
            .with_max_depth(4);
        assert_eq!(config.aggregation_collection, "xref");
        assert_eq!(config.max_depth, 4);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: IndexConfig = serde_json::from_str(r#"{"maxDepth": 3}"#).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.aggregation_collection, "aggregations");
    }
}
