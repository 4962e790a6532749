// Copyright 2025 Cowboy AI, LLC.

//! Bidirectional reference maintenance
//!
//! After a rebuild changes an entity's outbound references, the aggregation
//! records of the *other* side must be updated so backward traversal stays
//! consistent: removed neighbors lose the back-pointer, added neighbors gain
//! it (upserting a stub record when none exists yet). Only the neighbor
//! types the rebuild itself computes are diffed; back-pointer maps owned by
//! other entities' maintenance passes are left alone.

use crate::edges::outgoing_edges;
use crate::keys::ParsedKey;
use crate::record::{record_filter, AggregationRecord};
use crate::resource_type::ResourceType;
use crate::storage::{BulkWriteReport, DocumentStore, UpdateSpec, WriteOp};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

/// Whether a reference update adds or removes a back-pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceChange {
    /// The neighbor gained a back-pointer (upserts a stub when absent)
    Added,
    /// The neighbor lost a back-pointer
    Removed,
}

/// One update against another entity's aggregation record.
#[derive(Debug, Clone)]
pub struct ReferenceUpdate {
    /// Type of the record being updated
    pub target_type: ResourceType,
    /// External key of the record being updated
    pub target_key: String,
    /// Added or removed
    pub change: ReferenceChange,
    /// The storage operation carrying the change
    pub write: WriteOp,
}

/// Diff two versions of an entity's aggregation record into the update
/// operations owed to its neighbors. `previous = None` treats every current
/// neighbor as added.
pub fn diff(
    previous: Option<&AggregationRecord>,
    current: &AggregationRecord,
) -> Vec<ReferenceUpdate> {
    let mut updates = Vec::new();
    let now = Value::String(Utc::now().to_rfc3339());
    let own = current.resource_type;

    for edge in outgoing_edges(own) {
        let target = edge.to;
        let old_keys = previous
            .map(|record| record.keys_for(target))
            .unwrap_or_default();
        let new_keys = current.keys_for(target);

        for removed in old_keys.keys().filter(|key| !new_keys.contains_key(*key)) {
            let update = UpdateSpec::new()
                .pull(own.ids_field(), current.gameday_id.clone())
                .unset_map_entry(own.keys_field(), current.external_key.clone())
                .set("lastUpdated", now.clone());
            updates.push(ReferenceUpdate {
                target_type: target,
                target_key: removed.clone(),
                change: ReferenceChange::Removed,
                write: WriteOp::UpdateOne {
                    filter: record_filter(target, removed),
                    update,
                    upsert: false,
                },
            });
        }

        for (added, neighbor_id) in new_keys.iter().filter(|(key, _)| !old_keys.contains_key(*key))
        {
            let mut update = UpdateSpec::new()
                .add_to_set(own.ids_field(), current.gameday_id.clone())
                .set_map_entry(
                    own.keys_field(),
                    current.external_key.clone(),
                    current.gameday_id.clone(),
                )
                .set("lastUpdated", now.clone())
                .set_on_insert("gamedayId", neighbor_id.clone());
            // identity fields inferable from the key; builder-composed keys
            // always parse
            if let Ok(parsed) = ParsedKey::parse_for(target, added) {
                for (field, value) in parsed.identity_pairs() {
                    update = update.set_on_insert(field, value);
                }
            }
            updates.push(ReferenceUpdate {
                target_type: target,
                target_key: added.clone(),
                change: ReferenceChange::Added,
                write: WriteOp::UpdateOne {
                    filter: record_filter(target, added),
                    update,
                    upsert: true,
                },
            });
        }
    }
    updates
}

/// Apply reference updates as one batched write. Failures are logged and
/// swallowed; back-pointer maintenance is best-effort and the next full
/// rebuild of either side converges the maps.
pub async fn apply<S: DocumentStore>(
    store: &S,
    collection: &str,
    updates: Vec<ReferenceUpdate>,
) -> BulkWriteReport {
    if updates.is_empty() {
        return BulkWriteReport::default();
    }
    let count = updates.len();
    let ops: Vec<WriteOp> = updates.into_iter().map(|update| update.write).collect();
    match store.bulk_write(collection, ops).await {
        Ok(report) => {
            debug!(
                ops = count,
                matched = report.matched,
                upserted = report.upserted,
                "applied reference updates"
            );
            report
        }
        Err(err) => {
            warn!(ops = count, error = %err, "reference update batch failed");
            BulkWriteReport::default()
        }
    }
}
