// Copyright 2025 Cowboy AI, LLC.

//! The index facade
//!
//! [`XrefIndex`] wires the write side (record builder, reference
//! maintenance, cascade orchestrator) and the read side (fetch composer)
//! over one document store. Writers call `rebuild_entity` when an entity
//! changes and `rebuild_transitively` when a competition root changes;
//! readers call `fetch`. The `*_within` variants bound an operation with a
//! deadline.

use crate::builder::{RebuildOutcome, Rebuilder};
use crate::cascade::{CascadeOrchestrator, CascadeReport};
use crate::config::IndexConfig;
use crate::errors::{AggregationError, AggregationResult};
use crate::read::{FetchComposer, FetchRequest, FetchResponse};
use crate::refmaint;
use crate::resource_type::ResourceType;
use crate::storage::{DocumentStore, Filter};
use std::sync::Arc;
use std::time::Duration;

/// The materialized cross-reference index over one document store.
pub struct XrefIndex<S> {
    rebuilder: Rebuilder<S>,
    cascade: CascadeOrchestrator<S>,
    composer: FetchComposer<S>,
    store: Arc<S>,
    config: IndexConfig,
}

impl<S: DocumentStore> XrefIndex<S> {
    /// Create an index over a store.
    pub fn new(store: Arc<S>, config: IndexConfig) -> Self {
        let rebuilder = Rebuilder::new(Arc::clone(&store), config.clone());
        Self {
            cascade: CascadeOrchestrator::new(rebuilder.clone()),
            composer: FetchComposer::new(Arc::clone(&store), config.clone()),
            rebuilder,
            store,
            config,
        }
    }

    /// Rebuild one entity's aggregation record and propagate back-pointer
    /// updates to its neighbors.
    pub async fn rebuild_entity(
        &self,
        resource_type: ResourceType,
        external_key: &str,
    ) -> AggregationResult<RebuildOutcome> {
        let outcome = self.rebuilder.rebuild(resource_type, external_key).await?;
        if let RebuildOutcome::Completed { record, previous } = &outcome {
            refmaint::apply(
                self.store.as_ref(),
                &self.config.aggregation_collection,
                refmaint::diff(previous.as_ref(), record),
            )
            .await;
        }
        Ok(outcome)
    }

    /// [`rebuild_entity`](Self::rebuild_entity) under a deadline. Abandoned
    /// work is safe: record replacement is idempotent under replay.
    pub async fn rebuild_entity_within(
        &self,
        resource_type: ResourceType,
        external_key: &str,
        limit: Duration,
    ) -> AggregationResult<RebuildOutcome> {
        match tokio::time::timeout(limit, self.rebuild_entity(resource_type, external_key)).await
        {
            Ok(result) => result,
            Err(_) => Err(AggregationError::Deadline {
                operation: "rebuild".to_string(),
                limit_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Rebuild a root and its transitive closure in dependency order.
    pub async fn rebuild_transitively(
        &self,
        root_type: ResourceType,
        root_external_key: &str,
    ) -> AggregationResult<CascadeReport> {
        self.cascade
            .rebuild_transitively(root_type, root_external_key)
            .await
    }

    /// [`rebuild_transitively`](Self::rebuild_transitively) under a
    /// deadline.
    pub async fn rebuild_transitively_within(
        &self,
        root_type: ResourceType,
        root_external_key: &str,
        limit: Duration,
    ) -> AggregationResult<CascadeReport> {
        match tokio::time::timeout(
            limit,
            self.rebuild_transitively(root_type, root_external_key),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AggregationError::Deadline {
                operation: "cascade".to_string(),
                limit_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Answer a fetch request.
    pub async fn fetch(&self, request: &FetchRequest) -> AggregationResult<FetchResponse> {
        self.composer.fetch(request).await
    }

    /// [`fetch`](Self::fetch) under a deadline.
    pub async fn fetch_within(
        &self,
        request: &FetchRequest,
        limit: Duration,
    ) -> AggregationResult<FetchResponse> {
        self.composer.fetch_within(request, limit).await
    }

    /// Number of aggregation records currently materialized.
    pub async fn record_count(&self) -> AggregationResult<u64> {
        Ok(self
            .store
            .count_documents(&self.config.aggregation_collection, &Filter::All)
            .await?)
    }

    /// The active configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}
