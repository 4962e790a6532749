// Copyright 2025 Cowboy AI, LLC.

//! Error types for index operations

use crate::edges::EdgeLabelError;
use crate::keys::KeyError;
use crate::read::routes::RouteParseError;
use crate::resource_type::ResourceType;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while maintaining or querying the index
#[derive(Debug, Clone, Error)]
pub enum AggregationError {
    /// Malformed request (missing root, empty include types, duplicate
    /// include types, malformed projection, incomplete routes)
    #[error("bad request: {reason}")]
    BadRequest {
        /// What was wrong with the request
        reason: String,
    },

    /// A caller-supplied route failed structural validation
    #[error("bad route: {0}")]
    BadRoute(#[from] RouteParseError),

    /// An edge label could not be parsed
    #[error("bad edge label: {0}")]
    BadEdgeLabel(#[from] EdgeLabelError),

    /// An external key (simple or compound) could not be parsed
    #[error("bad key: {0}")]
    BadKey(#[from] KeyError),

    /// The requested include type is not reachable from the root through the
    /// typed edge graph at all
    #[error("include type {target} is not graph-reachable from {root}")]
    UnreachableByGraph {
        /// Root type of the request
        root: ResourceType,
        /// Include type with no path
        target: ResourceType,
    },

    /// No provided route targets the requested include type
    #[error("include type {target} is not targeted by any route")]
    UnreachableByRoutes {
        /// Include type without a route
        target: ResourceType,
    },

    /// Route derivation found no scope-permissible path to the target
    #[error("no permissible route from {root} to {target} within depth {max_depth}")]
    UnreachableAutoRoute {
        /// Root type of the request
        root: ResourceType,
        /// Include type without a permissible path
        target: ResourceType,
        /// Depth bound the search ran under
        max_depth: usize,
    },

    /// The root entity has no aggregation record
    #[error("no aggregation record for root {root_type} with key {external_key}")]
    RootMissing {
        /// Root type of the request
        root_type: ResourceType,
        /// Root external key
        external_key: String,
    },

    /// An entity referenced during a rebuild was not found in its home
    /// collection
    #[error("entity not found: {resource_type} with key {external_key}")]
    NotFound {
        /// Type of the missing entity
        resource_type: ResourceType,
        /// External key searched for
        external_key: String,
    },

    /// A source document exists but carries no usable identity
    #[error("malformed source document for {resource_type}: {reason}")]
    MalformedSource {
        /// Type of the bad source document
        resource_type: ResourceType,
        /// What was missing or inconsistent
        reason: String,
    },

    /// Storage layer failure, caller-retryable
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The request deadline elapsed before the operation finished
    #[error("deadline of {limit_ms}ms exceeded during {operation}")]
    Deadline {
        /// Operation that was cut short
        operation: String,
        /// The deadline that was exceeded, in milliseconds
        limit_ms: u64,
    },

    /// A broken internal assumption; fail fast, do not retry
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Result type for index operations
pub type AggregationResult<T> = Result<T, AggregationError>;

impl From<serde_json::Error> for AggregationError {
    fn from(err: serde_json::Error) -> Self {
        AggregationError::Storage(StorageError::Serialization(err.to_string()))
    }
}

impl AggregationError {
    /// Machine code for transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            AggregationError::BadRequest { .. }
            | AggregationError::BadRoute(_)
            | AggregationError::BadEdgeLabel(_)
            | AggregationError::BadKey(_) => "BadRequest",
            AggregationError::UnreachableByGraph { .. } => "UnreachableByGraph",
            AggregationError::UnreachableByRoutes { .. } => "UnreachableByRoutes",
            AggregationError::UnreachableAutoRoute { .. } => "UnreachableAutoRoute",
            AggregationError::RootMissing { .. } => "RootMissing",
            AggregationError::NotFound { .. } => "NotFound",
            AggregationError::MalformedSource { .. } => "MalformedSource",
            AggregationError::Storage(_) => "StorageError",
            AggregationError::Deadline { .. } => "Deadline",
            AggregationError::InternalInvariant(_) => "InternalInvariant",
        }
    }

    /// True for errors caused by the caller's request; no writes occurred.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AggregationError::BadRequest { .. }
                | AggregationError::BadRoute(_)
                | AggregationError::BadEdgeLabel(_)
                | AggregationError::BadKey(_)
                | AggregationError::UnreachableByGraph { .. }
                | AggregationError::UnreachableByRoutes { .. }
                | AggregationError::UnreachableAutoRoute { .. }
        )
    }

    /// True when the failure is an absent entity or record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AggregationError::RootMissing { .. } | AggregationError::NotFound { .. }
        )
    }

    /// True for storage faults the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AggregationError::Storage(_))
    }

    /// Shorthand for a bad-request error.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        AggregationError::BadRequest {
            reason: reason.into(),
        }
    }
}
