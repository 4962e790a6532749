// Copyright 2025 Cowboy AI, LLC.

//! # Gameday XRef
//!
//! A materialized cross-reference index over a heterogeneous document store
//! of sports-domain entities (competitions, stages, events, teams, venues,
//! clubs, nations, sports persons, staff, rankings, key moments, governing
//! bodies). It sits between raw storage and a read API:
//!
//! - **Writers** call it to rebuild *aggregation records* when an entity
//!   changes. A record holds the entity's one-hop references: per neighbor
//!   type, an id list plus an externalKey-to-id map. Changes ripple through
//!   bidirectional reference maintenance, and touching a competition root
//!   rebuilds its transitive closure in a fixed dependency order.
//! - **Readers** ask for a root entity together with a bounded set of
//!   related entities. Routes through the typed edge graph are derived or
//!   validated, shared prefixes are planned once, ids are unioned per target
//!   type, a single budget is consumed in request order, and the surviving
//!   documents are fetched, sorted and projected from their home
//!   collections.
//!
//! The only external dependency the core assumes is a document store with
//! `find_one`, `count_documents`, a typed aggregation pipeline and batched
//! writes ([`storage::DocumentStore`]); [`storage::MemoryStore`] is the
//! in-process reference implementation backing the test suites.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gameday_xref::{FetchRequest, IndexConfig, MemoryStore, ResourceType, XrefIndex};
//! use std::sync::Arc;
//!
//! # async fn demo() -> gameday_xref::AggregationResult<()> {
//! let index = XrefIndex::new(Arc::new(MemoryStore::new()), IndexConfig::default());
//!
//! // write side: a competition changed
//! index
//!     .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
//!     .await?;
//!
//! // read side: the competition plus its stages and governing bodies
//! let request = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
//!     .with_include(ResourceType::Stage)
//!     .with_include(ResourceType::Sgo)
//!     .with_budget(20);
//! let response = index.fetch(&request).await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod cascade;
mod config;
mod edges;
mod errors;
mod index;
mod keys;
mod record;
mod refmaint;
mod resource_type;

pub mod read;
pub mod storage;

pub use builder::{RebuildOutcome, Rebuilder};
pub use cascade::{CascadeOrchestrator, CascadeReport, EntityRef, CASCADE_PHASES};
pub use config::IndexConfig;
pub use edges::{find_edge, outgoing_edges, Edge, EdgeLabel, EdgeLabelError, EdgeResolution, EDGES};
pub use errors::{AggregationError, AggregationResult};
pub use index::XrefIndex;
pub use keys::{
    external_key_of, short_hash, ExternalKey, KeyError, KeyMomentKey, ParsedKey, RankingKey,
    RankingVariant, StaffAffiliation, StaffKey, KEY_SEP, RANKING_LABEL_SEP, RANKING_POS_SEP,
};
pub use read::{
    FetchComposer, FetchRequest, FetchResponse, FieldProjections, Overflow, ProjectionGroup,
    ProjectionPolicy, RootRef, Route, RouteParseError, RouteSpec, TraversalStep, TypeResult,
};
pub use record::{record_filter, AggregationRecord, NeighborRefs};
pub use refmaint::{apply as apply_reference_updates, diff as diff_references, ReferenceChange, ReferenceUpdate};
pub use resource_type::{ResourceType, ALL_RESOURCE_TYPES};
pub use storage::{DocumentStore, MemoryStore};
