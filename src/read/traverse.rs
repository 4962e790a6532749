// Copyright 2025 Cowboy AI, LLC.

//! Traversal execution over the aggregation collection
//!
//! Executes a planned step list: depth-0 steps read straight off the root's
//! aggregation record; deeper steps run as facet branches over the
//! aggregation collection, one aggregate call per depth, unwinding the
//! step's field and unioning with set-addition. Unions preserve first-seen
//! order, which is what makes budget slicing deterministic downstream.

use crate::errors::{AggregationError, AggregationResult};
use crate::read::plan::TraversalStep;
use crate::read::routes::Route;
use crate::record::{record_filter, AggregationRecord};
use crate::resource_type::ResourceType;
use crate::storage::{DocumentStore, Filter, GroupSpec, PipelineStage};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::debug;

/// The result of executing a plan: the root record plus one id set per step.
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    /// The root's aggregation record
    pub root_record: AggregationRecord,
    /// Step outputs, keyed by step key (edge label)
    pub outputs: IndexMap<String, IndexSet<String>>,
}

impl TraversalOutcome {
    /// The final id set of a route: the output of its last hop.
    pub fn final_ids(&self, route: &Route) -> IndexSet<String> {
        route
            .final_label()
            .and_then(|label| self.outputs.get(&label).cloned())
            .unwrap_or_default()
    }
}

/// Execute the planned steps for a root entity.
pub async fn execute<S: DocumentStore>(
    store: &S,
    collection: &str,
    root_type: ResourceType,
    root_external_key: &str,
    steps: &[TraversalStep],
) -> AggregationResult<TraversalOutcome> {
    let root_doc = store
        .find_one(collection, &record_filter(root_type, root_external_key))
        .await?
        .ok_or_else(|| AggregationError::RootMissing {
            root_type,
            external_key: root_external_key.to_string(),
        })?;
    let root_record =
        AggregationRecord::from_document(&root_doc).map_err(AggregationError::InternalInvariant)?;

    let mut outputs: IndexMap<String, IndexSet<String>> = IndexMap::new();
    let mut cursor = 0;
    while cursor < steps.len() {
        let depth = steps[cursor].depth;
        let group_end = steps[cursor..]
            .iter()
            .position(|step| step.depth != depth)
            .map(|offset| cursor + offset)
            .unwrap_or(steps.len());
        let group = &steps[cursor..group_end];
        cursor = group_end;

        if depth == 0 {
            for step in group {
                outputs.insert(step.key.clone(), root_record.ids_for(step.edge.to));
            }
            continue;
        }

        // same-depth steps run as parallel facet branches over one call
        let mut branches: IndexMap<String, Vec<PipelineStage>> = IndexMap::new();
        for step in group {
            let depends_on = step.depends_on.as_deref().ok_or_else(|| {
                AggregationError::InternalInvariant(format!(
                    "step {} at depth {} has no dependency",
                    step.key, step.depth
                ))
            })?;
            let input = outputs.get(depends_on).ok_or_else(|| {
                AggregationError::InternalInvariant(format!(
                    "step {} depends on unplanned step {}",
                    step.key, depends_on
                ))
            })?;
            if input.is_empty() {
                outputs.insert(step.key.clone(), IndexSet::new());
                continue;
            }
            branches.insert(
                step.output_name.clone(),
                vec![
                    PipelineStage::Match(Filter::And(vec![
                        Filter::eq("resourceType", step.edge.from.wire_name()),
                        Filter::is_in(
                            "gamedayId",
                            input.iter().cloned().collect::<Vec<String>>(),
                        ),
                    ])),
                    PipelineStage::Unwind {
                        path: step.edge.field.to_string(),
                    },
                    PipelineStage::Group(GroupSpec {
                        add_to_set: vec![("ids".to_string(), step.edge.field.to_string())],
                    }),
                ],
            );
        }
        if branches.is_empty() {
            continue;
        }
        let produced = store
            .aggregate(collection, &[PipelineStage::Facet(branches)])
            .await?;
        let facet_doc = produced.first().cloned().unwrap_or(Value::Null);
        for step in group {
            if outputs.contains_key(&step.key) {
                continue;
            }
            let ids = facet_output_ids(&facet_doc, &step.output_name);
            debug!(step = %step.key, depth, count = ids.len(), "traversal step executed");
            outputs.insert(step.key.clone(), ids);
        }
    }

    Ok(TraversalOutcome {
        root_record,
        outputs,
    })
}

/// Union route final-id sets per target type, in route order.
pub fn union_by_target(
    routes: &[Route],
    outcome: &TraversalOutcome,
) -> IndexMap<ResourceType, IndexSet<String>> {
    let mut unions: IndexMap<ResourceType, IndexSet<String>> = IndexMap::new();
    for route in routes {
        let entry = unions.entry(route.target).or_default();
        entry.extend(outcome.final_ids(route));
    }
    unions
}

fn facet_output_ids(facet_doc: &Value, output_name: &str) -> IndexSet<String> {
    facet_doc
        .get(output_name)
        .and_then(Value::as_array)
        .and_then(|groups| groups.first())
        .and_then(|group| group.get("ids"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
