// Copyright 2025 Cowboy AI, LLC.

//! Read side: route planning and fetch composition
//!
//! Answers cross-collection fetch requests: derive or validate routes
//! through the typed edge graph, plan shared-prefix deduplicated traversal
//! steps, execute them over the materialized aggregation records, union and
//! budget the surviving ids, then materialize documents from their home
//! collections with sort and projection policies applied.

pub mod budget;
pub mod composer;
pub mod plan;
pub mod projection;
pub mod request;
pub mod routes;
pub mod traverse;

pub use budget::{apply_budget, BudgetOutcome, BudgetSlice};
pub use composer::FetchComposer;
pub use plan::{plan_steps, step_output_name, TraversalStep};
pub use projection::{FieldProjections, ProjectionGroup, ProjectionPolicy, ProjectionRule};
pub use request::{FetchRequest, FetchResponse, Overflow, RootRef, TypeResult};
pub use routes::{
    derive_routes, parse_explicit_route, parse_explicit_routes, Route, RouteParseError, RouteSpec,
};
pub use traverse::{execute as execute_traversal, union_by_target, TraversalOutcome};
