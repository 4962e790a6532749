// Copyright 2025 Cowboy AI, LLC.

//! Budget enforcement
//!
//! A single integer budget is consumed in request order: the root first when
//! it is among the include types, then each target type in the caller's
//! order. Ids beyond the budget flow into per-type overflow sets for paged
//! follow-up. Slicing happens in first-seen traversal order, so results are
//! deterministic whenever the store enumerates deterministically.

use crate::resource_type::ResourceType;
use indexmap::{IndexMap, IndexSet};

/// Included and overflowed ids of one type after budgeting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetSlice {
    /// Ids to materialize
    pub included: Vec<String>,
    /// Ids that survived traversal but exceeded the budget
    pub overflow: Vec<String>,
}

/// Outcome of applying the budget to the per-type unions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetOutcome {
    /// Whether the root itself is materialized
    pub root_included: bool,
    /// Per include type, the slice, in request order
    pub slices: IndexMap<ResourceType, BudgetSlice>,
}

/// Apply `budget` to the unions, in request order. `root` and `root_id` are
/// consulted only when `include_types` contains the root type, which then
/// contributes exactly one id before any target type.
pub fn apply_budget(
    root: ResourceType,
    root_id: &str,
    include_types: &[ResourceType],
    unions: &IndexMap<ResourceType, IndexSet<String>>,
    budget: usize,
) -> BudgetOutcome {
    let mut remaining = budget;
    let mut outcome = BudgetOutcome::default();

    if include_types.contains(&root) {
        if remaining > 0 {
            remaining -= 1;
            outcome.root_included = true;
            outcome
                .slices
                .insert(root, BudgetSlice {
                    included: vec![root_id.to_string()],
                    overflow: Vec::new(),
                });
        } else {
            outcome.slices.insert(root, BudgetSlice {
                included: Vec::new(),
                overflow: vec![root_id.to_string()],
            });
        }
    }

    for target in include_types {
        if *target == root {
            continue;
        }
        let union = unions.get(target).cloned().unwrap_or_default();
        let take = remaining.min(union.len());
        let mut ids = union.into_iter();
        let included: Vec<String> = ids.by_ref().take(take).collect();
        let overflow: Vec<String> = ids.collect();
        remaining -= take;
        outcome.slices.insert(*target, BudgetSlice { included, overflow });
    }
    outcome
}
