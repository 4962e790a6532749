// Copyright 2025 Cowboy AI, LLC.

//! Storage contract for the cross-reference index
//!
//! The index assumes a single external dependency: a document store exposing
//! per-collection `find_one`, `count_documents`, a typed aggregation pipeline,
//! and batched writes. Any engine providing these capabilities can sit behind
//! the [`DocumentStore`] trait; the crate ships [`MemoryStore`](memory::MemoryStore)
//! as the in-process reference implementation used by the test suites.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A stored document. Documents are schemaless JSON objects; typed layers
/// above the store interpret them.
pub type Document = Value;

/// Storage layer errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The backend reported a failure (connection, write conflict, ...)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A pipeline stage was used in a shape the engine cannot execute
    #[error("unsupported pipeline shape: {0}")]
    UnsupportedPipeline(String),

    /// Document (de)serialization failed
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

/// Sort direction for a single sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// Filter language for `find_one`, `count_documents` and `Match` stages.
///
/// Equality follows document-database semantics: a filter value matches a
/// field that equals it, or an array field containing an equal element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every document
    All,
    /// Field equals value (or array field contains it)
    Eq(String, Value),
    /// Field equals any of the values (array containment included)
    In(String, Vec<Value>),
    /// Field presence check
    Exists(String, bool),
    /// All sub-filters match
    And(Vec<Filter>),
    /// At least one sub-filter matches
    Or(Vec<Filter>),
}

impl Filter {
    /// Convenience equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Convenience membership filter.
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }
}

/// Group stage specification. Only the null-key grouping with `$addToSet`
/// accumulators is required by the index; the accumulator preserves
/// first-seen order and deduplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// `(output field, source field)` pairs collected with set-addition
    pub add_to_set: Vec<(String, String)>,
}

/// A typed aggregation pipeline stage.
///
/// This is the §storage-contract surface: match, projection, unwinding,
/// grouping with set-addition, per-document parallel sub-pipelines (facet),
/// left-outer joins (lookup), sorting, limiting, and merge-upsert with
/// replace-on-match / insert-on-miss semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Keep documents matching the filter
    Match(Filter),
    /// Keep only the listed top-level fields
    Project(Vec<String>),
    /// Emit one document per element of the array at `path`; documents
    /// without the array (or with an empty one) are dropped
    Unwind {
        /// Array field to unwind
        path: String,
    },
    /// Group all documents into one, applying set-addition accumulators
    Group(GroupSpec),
    /// Run each named sub-pipeline over the same input documents and emit a
    /// single document mapping each name to its sub-pipeline's output array
    Facet(IndexMap<String, Vec<PipelineStage>>),
    /// Left-outer join: attach matching documents from another collection
    Lookup {
        /// Foreign collection name
        from: String,
        /// Field on the input documents (scalar or array of join values)
        local_field: String,
        /// Field on the foreign documents
        foreign_field: String,
        /// Output array field for the joined documents
        as_field: String,
    },
    /// Stable multi-key sort
    Sort(Vec<(String, SortOrder)>),
    /// Truncate the document stream
    Limit(usize),
    /// Write the pipeline output into another collection, replacing documents
    /// that match on the `on` fields and inserting the rest. Emits nothing.
    Merge {
        /// Target collection
        into: String,
        /// Match fields for the upsert identity
        on: Vec<String>,
    },
}

/// Field-level update operators for [`WriteOp::UpdateOne`].
///
/// Map-valued fields are addressed as `(field, key)` pairs rather than dotted
/// paths: external keys legitimately contain separator bytes and ISO
/// timestamps, which dotted paths cannot carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSpec {
    /// Fields to set unconditionally
    pub set: IndexMap<String, Value>,
    /// Fields to set only when the update inserts a new document
    pub set_on_insert: IndexMap<String, Value>,
    /// Array fields to add values to, deduplicated
    pub add_to_set: IndexMap<String, Value>,
    /// Array fields to remove equal values from
    pub pull: IndexMap<String, Value>,
    /// Fields to remove
    pub unset: Vec<String>,
    /// `(map field, entry key, value)` entries to set
    pub set_map_entry: Vec<(String, String, Value)>,
    /// `(map field, entry key)` entries to remove
    pub unset_map_entry: Vec<(String, String)>,
}

impl UpdateSpec {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field unconditionally.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Set a field only on insert.
    pub fn set_on_insert(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_on_insert.insert(field.into(), value.into());
        self
    }

    /// Add a value to an array field, deduplicated.
    pub fn add_to_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_to_set.insert(field.into(), value.into());
        self
    }

    /// Remove equal values from an array field.
    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pull.insert(field.into(), value.into());
        self
    }

    /// Remove a field.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    /// Set an entry in a map-valued field.
    pub fn set_map_entry(
        mut self,
        field: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.set_map_entry
            .push((field.into(), key.into(), value.into()));
        self
    }

    /// Remove an entry from a map-valued field.
    pub fn unset_map_entry(mut self, field: impl Into<String>, key: impl Into<String>) -> Self {
        self.unset_map_entry.push((field.into(), key.into()));
        self
    }
}

/// A single batched write operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Replace the first matching document wholesale; optionally insert when
    /// no document matches (the upserted document is seeded from the
    /// filter's equality fields)
    ReplaceOne {
        /// Match filter
        filter: Filter,
        /// Replacement document
        replacement: Document,
        /// Insert when nothing matches
        upsert: bool,
    },
    /// Apply field-level operators to the first matching document
    UpdateOne {
        /// Match filter
        filter: Filter,
        /// Update operators
        update: UpdateSpec,
        /// Insert when nothing matches
        upsert: bool,
    },
}

/// Outcome counts of a `bulk_write` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkWriteReport {
    /// Operations that matched an existing document
    pub matched: usize,
    /// Documents modified in place
    pub modified: usize,
    /// Documents inserted via upsert
    pub upserted: usize,
}

/// The document-store contract assumed by the index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the first document in `collection` matching `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError>;

    /// Count documents in `collection` matching `filter`.
    async fn count_documents(&self, collection: &str, filter: &Filter)
        -> Result<u64, StorageError>;

    /// Execute a typed aggregation pipeline over `collection`.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[PipelineStage],
    ) -> Result<Vec<Document>, StorageError>;

    /// Apply a batch of write operations to `collection`, in order.
    async fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
    ) -> Result<BulkWriteReport, StorageError>;
}
