// Copyright 2025 Cowboy AI, LLC.

//! Routes: validated paths through the typed edge graph
//!
//! A route is an ordered list of edge labels forming a contiguous, simple
//! path from the request's root type to a target type. Callers may supply
//! routes explicitly (validated strictly, with hop-indexed errors) or let
//! the planner derive the best permissible path per target.
//!
//! Derivation enumerates simple paths (no node twice, the root included) up
//! to the configured depth, filters them through the scope regime, and picks
//! the argmin under `(scope toggles, hops, lexicographic path string)`.
//! Explicit routes use a slightly looser cycle rule: only hop *destinations*
//! count as visited, so a one-hop self-loop such as `sgo.sgos->sgo` is a
//! legal route while a second pass over the same node is refused.

use crate::edges::{find_edge, outgoing_edges, Edge, EdgeLabel, EdgeLabelError};
use crate::errors::{AggregationError, AggregationResult};
use crate::resource_type::ResourceType;
use indexmap::IndexSet;
use thiserror::Error;

/// A caller-facing route specification (wire shape).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Route name, unique within a request
    pub key: String,
    /// Target type the route materializes
    pub to: ResourceType,
    /// Edge labels, in traversal order
    pub via: Vec<String>,
}

/// A validated route: a contiguous simple path through the edge table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route name
    pub key: String,
    /// Target type
    pub target: ResourceType,
    /// The hops, as declared edges
    pub hops: Vec<&'static Edge>,
}

impl Route {
    /// The edge label string of the final hop, if the route has hops.
    pub fn final_label(&self) -> Option<String> {
        self.hops.last().map(|edge| edge.label().to_string())
    }
}

/// Structural failures of an explicit route. Hop indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteParseError {
    /// The route had no hops
    #[error("route {route}: via must not be empty")]
    EmptyVia {
        /// Route key
        route: String,
    },

    /// A route at the given request position had no key
    #[error("route at position {index}: missing key")]
    MissingKey {
        /// 0-based position within the request's route list
        index: usize,
    },

    /// Two routes shared a key
    #[error("duplicate route key {key}")]
    DuplicateRouteKey {
        /// The repeated key
        key: String,
    },

    /// An edge label failed to parse
    #[error("route {route}: hop {hop}: {source}")]
    BadLabel {
        /// Route key
        route: String,
        /// 1-based hop index
        hop: usize,
        /// Underlying label error
        source: EdgeLabelError,
    },

    /// The label parsed but names no declared edge
    #[error("route {route}: hop {hop}: unknown edge {label}")]
    UnknownEdge {
        /// Route key
        route: String,
        /// 1-based hop index
        hop: usize,
        /// The offending label
        label: String,
    },

    /// A hop did not start where the previous hop ended
    #[error("route {route}: hop {hop}: expected to continue from {expected}, found {found}")]
    Discontinuity {
        /// Route key
        route: String,
        /// 1-based hop index
        hop: usize,
        /// Required source type
        expected: ResourceType,
        /// Declared source type
        found: ResourceType,
    },

    /// A hop revisited a node already on the route
    #[error("route {route}: hop {hop}: cycle detected at {node}")]
    CycleDetected {
        /// Route key
        route: String,
        /// 1-based hop index
        hop: usize,
        /// The revisited node
        node: ResourceType,
    },

    /// An edge label appeared twice
    #[error("route {route}: hop {hop}: duplicate edge {label}")]
    DuplicateEdge {
        /// Route key
        route: String,
        /// 1-based hop index
        hop: usize,
        /// The repeated label
        label: String,
    },

    /// The final hop did not land on the declared target
    #[error("route {route}: ends at {found}, declared target is {expected}")]
    WrongTarget {
        /// Route key
        route: String,
        /// Declared target
        expected: ResourceType,
        /// Actual final type
        found: ResourceType,
    },
}

/// Whether a hop is permitted under the route scope regime.
pub fn scope_permits(root_scoped: bool, from: ResourceType, to: ResourceType) -> bool {
    if root_scoped {
        // no re-entry into competition scope through an unscoped type
        !(!from.is_competition_scoped() && to.is_competition_scoped())
    } else {
        // no traversal between two competition-scoped types
        !(from.is_competition_scoped() && to.is_competition_scoped())
    }
}

/// Validate one explicit route against the edge table.
pub fn parse_explicit_route(
    root: ResourceType,
    spec: &RouteSpec,
) -> Result<Route, RouteParseError> {
    if spec.via.is_empty() {
        return Err(RouteParseError::EmptyVia {
            route: spec.key.clone(),
        });
    }
    let mut hops: Vec<&'static Edge> = Vec::with_capacity(spec.via.len());
    let mut visited: IndexSet<ResourceType> = IndexSet::new();
    let mut labels: IndexSet<&str> = IndexSet::new();
    let mut cursor = root;
    for (i, raw) in spec.via.iter().enumerate() {
        let hop = i + 1;
        let label = EdgeLabel::parse(raw).map_err(|source| RouteParseError::BadLabel {
            route: spec.key.clone(),
            hop,
            source,
        })?;
        let edge = find_edge(&label).ok_or_else(|| RouteParseError::UnknownEdge {
            route: spec.key.clone(),
            hop,
            label: raw.clone(),
        })?;
        if edge.from != cursor {
            return Err(RouteParseError::Discontinuity {
                route: spec.key.clone(),
                hop,
                expected: cursor,
                found: edge.from,
            });
        }
        if visited.contains(&edge.to) {
            return Err(RouteParseError::CycleDetected {
                route: spec.key.clone(),
                hop,
                node: edge.to,
            });
        }
        if labels.contains(raw.as_str()) {
            return Err(RouteParseError::DuplicateEdge {
                route: spec.key.clone(),
                hop,
                label: raw.clone(),
            });
        }
        visited.insert(edge.to);
        labels.insert(raw.as_str());
        cursor = edge.to;
        hops.push(edge);
    }
    if cursor != spec.to {
        return Err(RouteParseError::WrongTarget {
            route: spec.key.clone(),
            expected: spec.to,
            found: cursor,
        });
    }
    Ok(Route {
        key: spec.key.clone(),
        target: spec.to,
        hops,
    })
}

/// Validate a request's explicit route list: keys present and unique, every
/// route structurally sound.
pub fn parse_explicit_routes(
    root: ResourceType,
    specs: &[RouteSpec],
) -> Result<Vec<Route>, RouteParseError> {
    let mut keys: IndexSet<&str> = IndexSet::new();
    let mut routes = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        if spec.key.is_empty() {
            return Err(RouteParseError::MissingKey { index });
        }
        if !keys.insert(spec.key.as_str()) {
            return Err(RouteParseError::DuplicateRouteKey {
                key: spec.key.clone(),
            });
        }
        routes.push(parse_explicit_route(root, spec)?);
    }
    Ok(routes)
}

/// Confirm that each include type is reachable from the root through the
/// edge graph, ignoring the scope regime.
pub fn assert_graph_reachable(
    root: ResourceType,
    include_types: &[ResourceType],
) -> AggregationResult<()> {
    let mut reachable: IndexSet<ResourceType> = IndexSet::new();
    reachable.insert(root);
    let mut frontier = vec![root];
    while let Some(current) = frontier.pop() {
        for edge in outgoing_edges(current) {
            if reachable.insert(edge.to) {
                frontier.push(edge.to);
            }
        }
    }
    for target in include_types {
        if !reachable.contains(target) {
            return Err(AggregationError::UnreachableByGraph {
                root,
                target: *target,
            });
        }
    }
    Ok(())
}

/// Confirm that each include type other than the root is the target of at
/// least one route.
pub fn assert_route_coverage(
    root: ResourceType,
    include_types: &[ResourceType],
    routes: &[Route],
) -> AggregationResult<()> {
    for target in include_types {
        if *target == root {
            continue;
        }
        if !routes.iter().any(|route| route.target == *target) {
            return Err(AggregationError::UnreachableByRoutes { target: *target });
        }
    }
    Ok(())
}

/// Count scope-class transitions along the node sequence of a path.
fn scope_toggles(root: ResourceType, hops: &[&'static Edge]) -> usize {
    let mut toggles = 0;
    let mut current = root.is_competition_scoped();
    for edge in hops {
        let next = edge.to.is_competition_scoped();
        if next != current {
            toggles += 1;
        }
        current = next;
    }
    toggles
}

fn path_string(hops: &[&'static Edge]) -> String {
    hops.iter()
        .map(|edge| edge.label().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Enumerate scope-permissible simple paths from `root` to `target`, no
/// longer than `max_depth` hops. The root counts as visited, so no path
/// returns to it.
fn enumerate_paths(
    root: ResourceType,
    target: ResourceType,
    max_depth: usize,
) -> Vec<Vec<&'static Edge>> {
    let root_scoped = root.is_competition_scoped();
    let mut results = Vec::new();
    let mut path: Vec<&'static Edge> = Vec::new();
    let mut visited: IndexSet<ResourceType> = IndexSet::new();
    visited.insert(root);

    fn dfs(
        current: ResourceType,
        target: ResourceType,
        root_scoped: bool,
        max_depth: usize,
        path: &mut Vec<&'static Edge>,
        visited: &mut IndexSet<ResourceType>,
        results: &mut Vec<Vec<&'static Edge>>,
    ) {
        if path.len() >= max_depth {
            return;
        }
        for edge in outgoing_edges(current) {
            if !scope_permits(root_scoped, edge.from, edge.to) {
                continue;
            }
            if visited.contains(&edge.to) {
                continue;
            }
            path.push(edge);
            if edge.to == target {
                results.push(path.clone());
            } else {
                visited.insert(edge.to);
                dfs(edge.to, target, root_scoped, max_depth, path, visited, results);
                visited.shift_remove(&edge.to);
            }
            path.pop();
        }
    }

    dfs(
        root,
        target,
        root_scoped,
        max_depth,
        &mut path,
        &mut visited,
        &mut results,
    );
    results
}

/// Derive the single best route per include type. Targets equal to the root
/// are omitted (the root is materialized without traversal).
pub fn derive_routes(
    root: ResourceType,
    include_types: &[ResourceType],
    max_depth: usize,
) -> AggregationResult<Vec<Route>> {
    let mut routes = Vec::new();
    for target in include_types {
        if *target == root {
            continue;
        }
        let candidates = enumerate_paths(root, *target, max_depth);
        let best = candidates
            .into_iter()
            .min_by_key(|hops| {
                (
                    scope_toggles(root, hops),
                    hops.len(),
                    path_string(hops),
                )
            })
            .ok_or(AggregationError::UnreachableAutoRoute {
                root,
                target: *target,
                max_depth,
            })?;
        routes.push(Route {
            key: format!("auto:{target}"),
            target: *target,
            hops: best,
        });
    }
    Ok(routes)
}
