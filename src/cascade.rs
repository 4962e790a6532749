// Copyright 2025 Cowboy AI, LLC.

//! Cascade orchestrator
//!
//! When a competition changes, every transitively reachable aggregation
//! record is rebuilt in a fixed per-type order that mirrors the natural
//! fan-out of sports data: governing bodies first (by recursive descent over
//! `sgo` alone), then stages, events, rankings, teams, staff, sports
//! persons, clubs, nations and finally venues. Worklists are sets and every
//! `(type, key)` pair is attempted at most once, so the walk terminates on
//! cyclic graphs.

use crate::builder::{RebuildOutcome, Rebuilder};
use crate::errors::{AggregationError, AggregationResult};
use crate::keys::ParsedKey;
use crate::refmaint;
use crate::resource_type::ResourceType;
use crate::storage::DocumentStore;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A `(type, external key)` pair tracked by the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    /// Entity type
    pub resource_type: ResourceType,
    /// External key
    pub external_key: String,
}

impl EntityRef {
    fn new(resource_type: ResourceType, external_key: impl Into<String>) -> Self {
        Self {
            resource_type,
            external_key: external_key.into(),
        }
    }
}

/// What happened to each entity during one cascade. The four sets are
/// disjoint apart from `attempted`, which contains every entry of the other
/// three.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CascadeReport {
    /// Every entry the cascade looked at
    pub attempted: IndexSet<EntityRef>,
    /// Entries whose record was rebuilt
    pub completed: IndexSet<EntityRef>,
    /// Entries that were missing or errored
    pub failed: IndexSet<EntityRef>,
    /// Entries whose type has no registered rebuild handler
    pub skipped: IndexSet<EntityRef>,
}

impl CascadeReport {
    /// Completed entries of one type, in rebuild order.
    pub fn completed_of(&self, resource_type: ResourceType) -> Vec<&EntityRef> {
        self.completed
            .iter()
            .filter(|entry| entry.resource_type == resource_type)
            .collect()
    }

    /// `(attempted, completed, failed, skipped)` counts.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.attempted.len(),
            self.completed.len(),
            self.failed.len(),
            self.skipped.len(),
        )
    }
}

/// The fixed per-type rebuild order after the root itself.
pub const CASCADE_PHASES: [ResourceType; 10] = [
    ResourceType::Sgo,
    ResourceType::Stage,
    ResourceType::Event,
    ResourceType::Ranking,
    ResourceType::Team,
    ResourceType::Staff,
    ResourceType::SportsPerson,
    ResourceType::Club,
    ResourceType::Nation,
    ResourceType::Venue,
];

/// Downstream worklists fed from a completed record of the given type.
fn harvest_targets(resource_type: ResourceType) -> &'static [ResourceType] {
    match resource_type {
        ResourceType::Competition => &[ResourceType::Sgo, ResourceType::Stage],
        ResourceType::Sgo => &[ResourceType::Sgo],
        ResourceType::Stage => &[ResourceType::Event, ResourceType::Ranking],
        ResourceType::Event => &[
            ResourceType::Ranking,
            ResourceType::Team,
            ResourceType::Venue,
        ],
        ResourceType::Team => &[
            ResourceType::Staff,
            ResourceType::SportsPerson,
            ResourceType::Club,
            ResourceType::Nation,
            ResourceType::Venue,
        ],
        ResourceType::Staff => &[
            ResourceType::SportsPerson,
            ResourceType::Club,
            ResourceType::Nation,
        ],
        _ => &[],
    }
}

/// Rebuilds the transitive closure of a root's aggregation records.
pub struct CascadeOrchestrator<S> {
    rebuilder: Rebuilder<S>,
}

impl<S: DocumentStore> CascadeOrchestrator<S> {
    /// Create an orchestrator over a rebuilder.
    pub fn new(rebuilder: Rebuilder<S>) -> Self {
        Self { rebuilder }
    }

    /// Rebuild the root and everything reachable from it, in dependency
    /// order. Per-entry failures are recorded and do not stop the walk.
    pub async fn rebuild_transitively(
        &self,
        root_type: ResourceType,
        root_external_key: &str,
    ) -> AggregationResult<CascadeReport> {
        if root_type != ResourceType::Competition {
            return Err(AggregationError::bad_request(format!(
                "cascade roots must be competitions, got {root_type}"
            )));
        }
        // a malformed root key is a caller error, not a failed entry
        let root_key = ParsedKey::parse_for(root_type, root_external_key)?.compose();

        let mut report = CascadeReport::default();
        let mut worklists: IndexMap<ResourceType, IndexSet<String>> = CASCADE_PHASES
            .into_iter()
            .map(|rt| (rt, IndexSet::new()))
            .collect();

        self.process(root_type, &root_key, &mut report, &mut worklists)
            .await;

        for phase in CASCADE_PHASES {
            let mut cursor = 0;
            loop {
                // the sgo phase appends to its own worklist while draining it
                let Some(key) = worklists[&phase].get_index(cursor).cloned() else {
                    break;
                };
                cursor += 1;
                self.process(phase, &key, &mut report, &mut worklists).await;
            }
            let (attempted, completed, failed, skipped) = report.counts();
            info!(
                phase = %phase,
                attempted, completed, failed, skipped,
                "cascade phase finished"
            );
        }
        Ok(report)
    }

    async fn process(
        &self,
        resource_type: ResourceType,
        external_key: &str,
        report: &mut CascadeReport,
        worklists: &mut IndexMap<ResourceType, IndexSet<String>>,
    ) {
        let entry = EntityRef::new(resource_type, external_key);
        if !report.attempted.insert(entry.clone()) {
            return;
        }
        match self.rebuilder.rebuild(resource_type, external_key).await {
            Ok(RebuildOutcome::Completed { record, previous }) => {
                refmaint::apply(
                    self.rebuilder.store().as_ref(),
                    &self.rebuilder.config().aggregation_collection,
                    refmaint::diff(previous.as_ref(), &record),
                )
                .await;
                for target in harvest_targets(resource_type) {
                    let keys = record.keys_for(*target);
                    if keys.is_empty() {
                        continue;
                    }
                    let list = worklists.entry(*target).or_default();
                    for key in keys.keys() {
                        list.insert(key.clone());
                    }
                }
                report.completed.insert(entry);
            }
            Ok(RebuildOutcome::NotFound) => {
                warn!(resource_type = %resource_type, external_key, "cascade entry not found");
                report.failed.insert(entry);
            }
            Ok(RebuildOutcome::Unsupported) => {
                debug!(resource_type = %resource_type, external_key, "cascade entry unsupported");
                report.skipped.insert(entry);
            }
            Err(err) => {
                warn!(
                    resource_type = %resource_type,
                    external_key,
                    error = %err,
                    "cascade entry failed"
                );
                report.failed.insert(entry);
            }
        }
    }
}
