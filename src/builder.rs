// Copyright 2025 Cowboy AI, LLC.

//! Aggregation record builder
//!
//! Rebuilds the one-hop aggregation record of a single entity: locate the
//! source document, resolve every outgoing edge against the target home
//! collections, then replace the record wholesale under its
//! `(resourceType, externalKey)` identity. Neighbor types that are not
//! outgoing-edge targets of the entity's type are back-pointers owned by the
//! reference-maintenance layer; a rebuild carries them over unchanged.

use crate::config::IndexConfig;
use crate::edges::{outgoing_edges, Edge, EdgeResolution};
use crate::errors::{AggregationError, AggregationResult};
use crate::keys::{external_key_of, ExternalKey, ParsedKey};
use crate::record::{record_filter, AggregationRecord};
use crate::resource_type::ResourceType;
use crate::storage::{Document, DocumentStore, Filter, PipelineStage, WriteOp};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a single-entity rebuild.
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    /// The record was rebuilt and upserted
    Completed {
        /// The new record
        record: AggregationRecord,
        /// The record as it was before this rebuild, if any
        previous: Option<AggregationRecord>,
    },
    /// The source entity does not exist in its home collection
    NotFound,
    /// The entity's type has no registered rebuild handler
    Unsupported,
}

/// Rebuilds aggregation records against a [`DocumentStore`].
pub struct Rebuilder<S> {
    store: Arc<S>,
    config: IndexConfig,
    supported: BTreeSet<ResourceType>,
}

impl<S> Clone for Rebuilder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            supported: self.supported.clone(),
        }
    }
}

impl<S: DocumentStore> Rebuilder<S> {
    /// Create a rebuilder with handlers registered for every resource type.
    pub fn new(store: Arc<S>, config: IndexConfig) -> Self {
        Self {
            store,
            config,
            supported: crate::resource_type::ALL_RESOURCE_TYPES.into_iter().collect(),
        }
    }

    /// Deregister the handler for a type; rebuilds of it report
    /// [`RebuildOutcome::Unsupported`] and cascades classify it as skipped.
    pub fn without_type(mut self, resource_type: ResourceType) -> Self {
        self.supported.remove(&resource_type);
        self
    }

    /// The store this rebuilder writes through.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Rebuild the aggregation record for one entity.
    pub async fn rebuild(
        &self,
        resource_type: ResourceType,
        external_key: &str,
    ) -> AggregationResult<RebuildOutcome> {
        if !self.supported.contains(&resource_type) {
            return Ok(RebuildOutcome::Unsupported);
        }
        let parsed = ParsedKey::parse_for(resource_type, external_key)?;
        let canonical = parsed.compose();

        let Some(source) = self
            .store
            .find_one(resource_type.collection(), &parsed.identity_filter())
            .await?
        else {
            return Ok(RebuildOutcome::NotFound);
        };

        let gameday_id = source
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| AggregationError::MalformedSource {
                resource_type,
                reason: "source document has no string _id".to_string(),
            })?
            .to_string();

        let previous = self.load_record(resource_type, &canonical).await?;

        // independent neighbor resolutions run concurrently
        let resolutions = try_join_all(
            outgoing_edges(resource_type)
                .map(|edge| self.resolve_edge(edge, &source, &canonical)),
        )
        .await?;

        let mut record = AggregationRecord::new(resource_type, &canonical, &gameday_id);
        record.name = display_name(resource_type, &source);
        for (field, value) in parsed.identity_pairs() {
            record.identity.insert(field.to_string(), value);
        }
        for (edge, pairs) in outgoing_edges(resource_type).zip(resolutions) {
            let refs = record.neighbors_mut(edge.to);
            for (key, id) in pairs {
                refs.insert(key, id);
            }
        }
        if let Some(previous) = &previous {
            let computed: BTreeSet<ResourceType> =
                outgoing_edges(resource_type).map(|edge| edge.to).collect();
            for (neighbor, refs) in &previous.neighbors {
                if !computed.contains(neighbor) && !refs.is_empty() {
                    record.neighbors.insert(*neighbor, refs.clone());
                }
            }
        }
        record
            .check_invariants()
            .map_err(AggregationError::InternalInvariant)?;

        self.store
            .bulk_write(
                &self.config.aggregation_collection,
                vec![WriteOp::ReplaceOne {
                    filter: record_filter(resource_type, &canonical),
                    replacement: record.to_document(),
                    upsert: true,
                }],
            )
            .await?;

        debug!(
            resource_type = %resource_type,
            external_key = %canonical,
            neighbors = record.neighbors.len(),
            "rebuilt aggregation record"
        );
        Ok(RebuildOutcome::Completed { record, previous })
    }

    /// Load an aggregation record by identity.
    pub async fn load_record(
        &self,
        resource_type: ResourceType,
        external_key: &str,
    ) -> AggregationResult<Option<AggregationRecord>> {
        let doc = self
            .store
            .find_one(
                &self.config.aggregation_collection,
                &record_filter(resource_type, external_key),
            )
            .await?;
        doc.map(|doc| {
            AggregationRecord::from_document(&doc).map_err(AggregationError::InternalInvariant)
        })
        .transpose()
    }

    async fn resolve_edge(
        &self,
        edge: &'static Edge,
        source: &Document,
        own_key: &str,
    ) -> AggregationResult<Vec<(String, String)>> {
        let pipeline = match edge.resolution {
            EdgeResolution::Refs { field } => {
                let refs = collect_refs(edge, source, field)?;
                if refs.is_empty() {
                    return Ok(Vec::new());
                }
                let clauses = refs
                    .iter()
                    .map(|key| {
                        Filter::And(vec![
                            Filter::eq("_externalId", key.id.clone()),
                            Filter::eq("_externalIdScope", key.scope.clone()),
                        ])
                    })
                    .collect();
                vec![
                    PipelineStage::Match(Filter::Or(clauses)),
                    PipelineStage::Project(
                        edge.to.identity_fields().iter().map(ToString::to_string).collect(),
                    ),
                ]
            }
            EdgeResolution::Reverse { field } => vec![
                PipelineStage::Match(Filter::eq(field, own_key)),
                PipelineStage::Project(
                    edge.to.identity_fields().iter().map(ToString::to_string).collect(),
                ),
            ],
        };
        let docs = self.store.aggregate(edge.to.collection(), &pipeline).await?;
        let mut pairs = Vec::with_capacity(docs.len());
        for doc in &docs {
            let id = doc.get("_id").and_then(Value::as_str).ok_or_else(|| {
                AggregationError::MalformedSource {
                    resource_type: edge.to,
                    reason: format!("neighbor document of {} has no string _id", edge.from),
                }
            })?;
            let key = external_key_of(edge.to, doc)?;
            pairs.push((key, id.to_string()));
        }
        Ok(pairs)
    }
}

/// Read the composed reference keys under a `Refs` field. The field may hold
/// a single key or an array of keys; each must parse as a simple external
/// key (only simple-keyed types are referenced this way).
fn collect_refs(
    edge: &'static Edge,
    source: &Document,
    field: &str,
) -> AggregationResult<Vec<ExternalKey>> {
    let raw: Vec<&str> = match source.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(key)) => vec![key.as_str()],
        Some(Value::Array(items)) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                keys.push(item.as_str().ok_or_else(|| {
                    AggregationError::MalformedSource {
                        resource_type: edge.from,
                        reason: format!("non-string entry in reference field {field}"),
                    }
                })?);
            }
            keys
        }
        Some(_) => {
            return Err(AggregationError::MalformedSource {
                resource_type: edge.from,
                reason: format!("reference field {field} is neither string nor array"),
            })
        }
    };
    let mut keys = Vec::with_capacity(raw.len());
    for key in raw {
        keys.push(
            ExternalKey::parse(key).map_err(|err| AggregationError::MalformedSource {
                resource_type: edge.from,
                reason: format!("reference field {field}: {err}"),
            })?,
        );
    }
    Ok(keys)
}

/// Domain display label for a home document.
fn display_name(resource_type: ResourceType, doc: &Document) -> Option<String> {
    let get = |field: &str| doc.get(field).and_then(Value::as_str);
    match resource_type {
        ResourceType::SportsPerson | ResourceType::Staff => match (get("lastName"), get("firstName"))
        {
            (Some(last), Some(first)) => Some(format!("{last}, {first}")),
            (Some(last), None) => Some(last.to_string()),
            _ => None,
        },
        ResourceType::Ranking => {
            let label = get("dateTimeLabel")?;
            let rank = doc.get("rank").and_then(Value::as_i64)?;
            Some(format!("{label} #{rank}"))
        }
        ResourceType::KeyMoment => {
            let kind = get("type")?;
            let date_time = get("dateTime")?;
            Some(format!("{kind} {date_time}"))
        }
        _ => get("name").map(ToString::to_string),
    }
}
