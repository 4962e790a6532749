// Copyright 2025 Cowboy AI, LLC.

//! Fetch request and response envelopes

use crate::errors::{AggregationError, AggregationResult};
use crate::read::projection::FieldProjections;
use crate::read::routes::RouteSpec;
use crate::resource_type::ResourceType;
use crate::storage::Document;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cross-collection fetch request: materialize a root entity together with
/// a budget-limited set of related entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Type of the root entity
    pub root_type: ResourceType,
    /// External key of the root entity
    pub root_external_key: String,
    /// Types to materialize; order drives budget consumption
    pub include_types: Vec<ResourceType>,
    /// Maximum number of materialized items across root and include types
    pub budget: usize,
    /// Explicit routes; derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<RouteSpec>>,
    /// Projection policy applied to fetched documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_projections: Option<FieldProjections>,
}

impl FetchRequest {
    /// Start a request for a root entity.
    pub fn new(root_type: ResourceType, root_external_key: impl Into<String>) -> Self {
        Self {
            root_type,
            root_external_key: root_external_key.into(),
            include_types: Vec::new(),
            budget: 0,
            routes: None,
            field_projections: None,
        }
    }

    /// Append an include type.
    pub fn with_include(mut self, resource_type: ResourceType) -> Self {
        self.include_types.push(resource_type);
        self
    }

    /// Set the budget.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Supply explicit routes.
    pub fn with_routes(mut self, routes: Vec<RouteSpec>) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Supply a projection policy.
    pub fn with_projections(mut self, projections: FieldProjections) -> Self {
        self.field_projections = Some(projections);
        self
    }

    /// Structural validation; no storage access.
    pub fn validate(&self) -> AggregationResult<()> {
        if self.root_external_key.is_empty() {
            return Err(AggregationError::bad_request("missing root external key"));
        }
        if self.include_types.is_empty() {
            return Err(AggregationError::bad_request("includeTypes must not be empty"));
        }
        for (i, resource_type) in self.include_types.iter().enumerate() {
            if self.include_types[..i].contains(resource_type) {
                return Err(AggregationError::bad_request(format!(
                    "includeTypes lists {resource_type} twice"
                )));
            }
        }
        Ok(())
    }
}

/// The root identity echoed in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RootRef {
    /// Root entity type
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Root external key (canonical form)
    pub external_key: String,
}

/// Ids that survived traversal but exceeded the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overflow {
    /// The type the ids belong to
    pub resource_type: ResourceType,
    /// Internal ids for paged follow-up
    pub overflow_ids: Vec<String>,
}

/// Materialized documents plus overflow for one include type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypeResult {
    /// Fetched documents, sorted and projected
    pub items: Vec<Document>,
    /// Budget remainder
    pub overflow: Overflow,
}

/// The fetch response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    /// Root identity
    pub root: RootRef,
    /// One entry per requested include type
    pub results: BTreeMap<ResourceType, TypeResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_rejects_structural_problems() {
        let missing_root = FetchRequest::new(ResourceType::Competition, "")
            .with_include(ResourceType::Stage);
        assert!(missing_root.validate().is_err());

        let empty_includes = FetchRequest::new(ResourceType::Competition, "289175[:]fifa");
        assert!(empty_includes.validate().is_err());

        let duplicated = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
            .with_include(ResourceType::Stage)
            .with_include(ResourceType::Stage);
        let err = duplicated.validate().unwrap_err();
        assert_eq!(err.code(), "BadRequest");

        let ok = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
            .with_include(ResourceType::Stage)
            .with_include(ResourceType::Sgo)
            .with_budget(20);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn request_round_trips_as_camel_case_json() {
        let request = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
            .with_include(ResourceType::Stage)
            .with_budget(20);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["rootType"], "competition");
        assert_eq!(json["rootExternalKey"], "289175[:]fifa");
        assert_eq!(json["includeTypes"][0], "stage");
        let back: FetchRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn envelope_serializes_per_spec_shape() {
        let response = FetchResponse {
            root: RootRef {
                resource_type: ResourceType::Competition,
                external_key: "289175[:]fifa".to_string(),
            },
            results: BTreeMap::from([(
                ResourceType::Stage,
                TypeResult {
                    items: vec![],
                    overflow: Overflow {
                        resource_type: ResourceType::Stage,
                        overflow_ids: vec!["gd-s9".to_string()],
                    },
                },
            )]),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["root"]["type"], "competition");
        assert_eq!(json["results"]["stage"]["overflow"]["overflowIds"][0], "gd-s9");
    }
}
