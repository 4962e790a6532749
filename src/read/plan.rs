// Copyright 2025 Cowboy AI, LLC.

//! Shared-prefix traversal planning
//!
//! All routes of a request are unified into an ordered list of steps, one
//! per distinct edge label. Routes sharing a prefix share the prefix's
//! steps, so each hop is executed once no matter how many routes cross it.
//! Steps are ordered by `(depth, key)`; output names are stable short
//! hashes, so plans are reproducible across runs.

use crate::edges::Edge;
use crate::keys::short_hash;
use crate::read::routes::Route;
use indexmap::IndexMap;

/// One planned traversal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalStep {
    /// The edge label string; unique per plan
    pub key: String,
    /// The declared edge this step walks
    pub edge: &'static Edge,
    /// 0-based distance from the root
    pub depth: usize,
    /// Key of the step producing this step's input ids; `None` at depth 0
    pub depends_on: Option<String>,
    /// Stable name for the step's output id set
    pub output_name: String,
}

/// Deterministic output name for a step: short hash of the label, prefixed
/// with the depth.
pub fn step_output_name(key: &str, depth: usize) -> String {
    format!("d{depth}_{}", short_hash(key))
}

/// Plan the deduplicated step list for a set of routes.
pub fn plan_steps(routes: &[Route]) -> Vec<TraversalStep> {
    let mut planned: IndexMap<String, TraversalStep> = IndexMap::new();
    for route in routes {
        let mut previous: Option<String> = None;
        for (depth, edge) in route.hops.iter().enumerate() {
            let key = edge.label().to_string();
            planned.entry(key.clone()).or_insert_with(|| TraversalStep {
                key: key.clone(),
                edge,
                depth,
                depends_on: previous.clone(),
                output_name: step_output_name(&key, depth),
            });
            previous = Some(key);
        }
    }
    let mut steps: Vec<TraversalStep> = planned.into_values().collect();
    steps.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.key.cmp(&b.key)));
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::routes::{parse_explicit_route, RouteSpec};
    use crate::resource_type::ResourceType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn route(key: &str, to: ResourceType, via: &[&str]) -> Route {
        parse_explicit_route(
            ResourceType::Competition,
            &RouteSpec {
                key: key.to_string(),
                to,
                via: via.iter().map(ToString::to_string).collect(),
            },
        )
        .unwrap()
    }

    fn shared_prefix_routes() -> Vec<Route> {
        vec![
            route(
                "teams",
                ResourceType::Team,
                &[
                    "competition.stages->stage",
                    "stage.events->event",
                    "event.teams->team",
                ],
            ),
            route(
                "venues",
                ResourceType::Venue,
                &[
                    "competition.stages->stage",
                    "stage.events->event",
                    "event.venues->venue",
                ],
            ),
            route(
                "eventRankings",
                ResourceType::Ranking,
                &[
                    "competition.stages->stage",
                    "stage.events->event",
                    "event.rankings->ranking",
                ],
            ),
            route(
                "stageRankings",
                ResourceType::Ranking,
                &["competition.stages->stage", "stage.rankings->ranking"],
            ),
        ]
    }

    #[test]
    fn shared_prefixes_plan_once() {
        let steps = plan_steps(&shared_prefix_routes());
        // two shared prefix steps, three event fan-outs, one stage fan-out
        assert_eq!(steps.len(), 6);
        let keys: Vec<&str> = steps.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "competition.stages->stage",
                "stage.events->event",
                "stage.rankings->ranking",
                "event.rankings->ranking",
                "event.teams->team",
                "event.venues->venue",
            ]
        );
        let depths: Vec<usize> = steps.iter().map(|s| s.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn dependencies_link_to_the_previous_hop() {
        let steps = plan_steps(&shared_prefix_routes());
        let by_key: IndexMap<&str, &TraversalStep> =
            steps.iter().map(|s| (s.key.as_str(), s)).collect();
        assert_eq!(by_key["competition.stages->stage"].depends_on, None);
        assert_eq!(
            by_key["stage.events->event"].depends_on.as_deref(),
            Some("competition.stages->stage")
        );
        assert_eq!(
            by_key["event.teams->team"].depends_on.as_deref(),
            Some("stage.events->event")
        );
        assert_eq!(
            by_key["stage.rankings->ranking"].depends_on.as_deref(),
            Some("competition.stages->stage")
        );
    }

    #[test]
    fn output_names_are_stable_and_distinct() {
        let steps = plan_steps(&shared_prefix_routes());
        let names: Vec<&str> = steps.iter().map(|s| s.output_name.as_str()).collect();
        let replay = plan_steps(&shared_prefix_routes());
        let replay_names: Vec<&str> = replay.iter().map(|s| s.output_name.as_str()).collect();
        assert_eq!(names, replay_names);
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
        assert!(names.iter().all(|n| n.starts_with('d')));
    }

    proptest! {
        /// Plans are invariant under permutation of the route list.
        #[test]
        fn plan_is_stable_under_route_permutation(seed in 0u64..256) {
            let mut routes = shared_prefix_routes();
            // cheap deterministic shuffle
            let len = routes.len();
            for i in 0..len {
                let j = ((seed as usize) + i * 7) % len;
                routes.swap(i, j);
            }
            let permuted = plan_steps(&routes);
            let baseline = plan_steps(&shared_prefix_routes());
            prop_assert_eq!(permuted, baseline);
        }
    }
}
