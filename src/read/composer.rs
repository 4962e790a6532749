// Copyright 2025 Cowboy AI, LLC.

//! Fetch composition
//!
//! The read-side entry point: validate the request, derive or validate
//! routes, plan the deduplicated traversal, execute it over the aggregation
//! collection, union and budget the surviving ids, then fetch, sort and
//! project the documents from their home collections. The read path
//! surfaces the first fatal error and performs no writes.

use crate::config::IndexConfig;
use crate::errors::{AggregationError, AggregationResult};
use crate::keys::ParsedKey;
use crate::read::budget::apply_budget;
use crate::read::plan::plan_steps;
use crate::read::projection::ProjectionPolicy;
use crate::read::request::{FetchRequest, FetchResponse, Overflow, RootRef, TypeResult};
use crate::read::routes::{
    assert_graph_reachable, assert_route_coverage, derive_routes, parse_explicit_routes,
};
use crate::read::traverse::{execute, union_by_target};
use crate::storage::{DocumentStore, Filter, PipelineStage, SortOrder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Answers fetch requests against the materialized index.
pub struct FetchComposer<S> {
    store: Arc<S>,
    config: IndexConfig,
}

impl<S: DocumentStore> FetchComposer<S> {
    /// Create a composer over a store.
    pub fn new(store: Arc<S>, config: IndexConfig) -> Self {
        Self { store, config }
    }

    /// Answer one fetch request.
    pub async fn fetch(&self, request: &FetchRequest) -> AggregationResult<FetchResponse> {
        request.validate()?;
        let policy = ProjectionPolicy::compile(request.field_projections.as_ref())?;
        let root = request.root_type;
        let root_key = ParsedKey::parse_for(root, &request.root_external_key)?.compose();

        let non_root: Vec<_> = request
            .include_types
            .iter()
            .copied()
            .filter(|rt| *rt != root)
            .collect();
        assert_graph_reachable(root, &non_root)?;

        let routes = match &request.routes {
            Some(specs) => parse_explicit_routes(root, specs)?,
            None => derive_routes(root, &request.include_types, self.config.max_depth)?,
        };
        assert_route_coverage(root, &request.include_types, &routes)?;

        let steps = plan_steps(&routes);
        debug!(
            root = %root,
            routes = routes.len(),
            steps = steps.len(),
            "executing fetch plan"
        );
        let outcome = execute(
            self.store.as_ref(),
            &self.config.aggregation_collection,
            root,
            &root_key,
            &steps,
        )
        .await?;

        let unions = union_by_target(&routes, &outcome);
        let budgeted = apply_budget(
            root,
            &outcome.root_record.gameday_id,
            &request.include_types,
            &unions,
            request.budget,
        );

        let mut results = BTreeMap::new();
        for resource_type in &request.include_types {
            let slice = budgeted.slices.get(resource_type).cloned().unwrap_or_default();
            let items = if slice.included.is_empty() {
                Vec::new()
            } else {
                let sort: Vec<(String, SortOrder)> = resource_type
                    .default_sort()
                    .iter()
                    .map(|(field, order)| (field.to_string(), *order))
                    .collect();
                let docs = self
                    .store
                    .aggregate(
                        resource_type.collection(),
                        &[
                            PipelineStage::Match(Filter::is_in(
                                "_id",
                                slice.included.clone(),
                            )),
                            PipelineStage::Sort(sort),
                        ],
                    )
                    .await?;
                docs.iter().map(|doc| policy.apply(*resource_type, doc)).collect()
            };
            results.insert(
                *resource_type,
                TypeResult {
                    items,
                    overflow: Overflow {
                        resource_type: *resource_type,
                        overflow_ids: slice.overflow,
                    },
                },
            );
        }

        Ok(FetchResponse {
            root: RootRef {
                resource_type: root,
                external_key: root_key,
            },
            results,
        })
    }

    /// [`fetch`](Self::fetch) under a deadline; expiry cancels in-flight
    /// storage operations and fails with `Deadline`.
    pub async fn fetch_within(
        &self,
        request: &FetchRequest,
        limit: Duration,
    ) -> AggregationResult<FetchResponse> {
        match tokio::time::timeout(limit, self.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(AggregationError::Deadline {
                operation: "fetch".to_string(),
                limit_ms: limit.as_millis() as u64,
            }),
        }
    }
}
