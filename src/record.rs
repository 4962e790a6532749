// Copyright 2025 Cowboy AI, LLC.

//! Aggregation records
//!
//! One record per materialized entity, keyed by `(resourceType, externalKey)`.
//! A record carries the entity's identity replicas plus, per neighbor type,
//! an id list and an externalKey-to-id map. The id list is always the value
//! set of the map; [`AggregationRecord::check_invariants`] verifies this.

use crate::resource_type::{ResourceType, ALL_RESOURCE_TYPES};
use crate::storage::{Document, Filter};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

/// Filter selecting the aggregation record of one entity.
pub fn record_filter(resource_type: ResourceType, external_key: &str) -> Filter {
    Filter::And(vec![
        Filter::eq("resourceType", resource_type.wire_name()),
        Filter::eq("externalKey", external_key),
    ])
}

/// One neighbor type's references inside an aggregation record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborRefs {
    /// Internal ids, first-seen order, deduplicated
    pub ids: IndexSet<String>,
    /// External key to internal id
    pub keys: IndexMap<String, String>,
}

impl NeighborRefs {
    /// Record one neighbor reference.
    pub fn insert(&mut self, external_key: impl Into<String>, gameday_id: impl Into<String>) {
        let gameday_id = gameday_id.into();
        self.ids.insert(gameday_id.clone());
        self.keys.insert(external_key.into(), gameday_id);
    }

    /// True when no neighbors are recorded.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The materialized one-hop reference document for a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRecord {
    /// Entity type
    pub resource_type: ResourceType,
    /// Canonical external key
    pub external_key: String,
    /// Internal id in the entity's home collection
    pub gameday_id: String,
    /// Display label
    pub name: Option<String>,
    /// Identity replicas of the home document's external id fields
    pub identity: IndexMap<String, Value>,
    /// Per neighbor type, the one-hop references
    pub neighbors: IndexMap<ResourceType, NeighborRefs>,
    /// Timestamp of the last rebuild
    pub last_updated: DateTime<Utc>,
}

impl AggregationRecord {
    /// Create an empty record for an entity.
    pub fn new(
        resource_type: ResourceType,
        external_key: impl Into<String>,
        gameday_id: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            external_key: external_key.into(),
            gameday_id: gameday_id.into(),
            name: None,
            identity: IndexMap::new(),
            neighbors: IndexMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Neighbor ids of a type, empty when the type has no entry.
    pub fn ids_for(&self, neighbor: ResourceType) -> IndexSet<String> {
        self.neighbors
            .get(&neighbor)
            .map(|refs| refs.ids.clone())
            .unwrap_or_default()
    }

    /// Neighbor key map of a type, empty when the type has no entry.
    pub fn keys_for(&self, neighbor: ResourceType) -> IndexMap<String, String> {
        self.neighbors
            .get(&neighbor)
            .map(|refs| refs.keys.clone())
            .unwrap_or_default()
    }

    /// Mutable neighbor entry for a type, created on first use.
    pub fn neighbors_mut(&mut self, neighbor: ResourceType) -> &mut NeighborRefs {
        self.neighbors.entry(neighbor).or_default()
    }

    /// Verify that every id list is exactly the value set of its key map.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (neighbor, refs) in &self.neighbors {
            let from_keys: IndexSet<String> = refs.keys.values().cloned().collect();
            if from_keys != refs.ids {
                return Err(format!(
                    "record ({}, {}): {} id list diverges from its key map",
                    self.resource_type,
                    self.external_key,
                    neighbor.ids_field()
                ));
            }
        }
        Ok(())
    }

    /// Render the record as its stored document layout.
    pub fn to_document(&self) -> Document {
        let mut doc = Map::new();
        doc.insert(
            "resourceType".to_string(),
            Value::String(self.resource_type.wire_name().to_string()),
        );
        doc.insert(
            "externalKey".to_string(),
            Value::String(self.external_key.clone()),
        );
        doc.insert(
            "gamedayId".to_string(),
            Value::String(self.gameday_id.clone()),
        );
        if let Some(name) = &self.name {
            doc.insert("name".to_string(), Value::String(name.clone()));
        }
        for (field, value) in &self.identity {
            doc.insert(field.clone(), value.clone());
        }
        for (neighbor, refs) in &self.neighbors {
            doc.insert(
                neighbor.ids_field().to_string(),
                Value::Array(refs.ids.iter().cloned().map(Value::String).collect()),
            );
            doc.insert(
                neighbor.keys_field().to_string(),
                Value::Object(
                    refs.keys
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            );
        }
        doc.insert(
            "lastUpdated".to_string(),
            Value::String(self.last_updated.to_rfc3339()),
        );
        Value::Object(doc)
    }

    /// Read a record back from its stored document layout. Returns a
    /// human-readable reason on malformed documents.
    pub fn from_document(doc: &Document) -> Result<Self, String> {
        let obj = doc.as_object().ok_or("aggregation record is not an object")?;
        let resource_type = obj
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or("missing resourceType")?
            .parse::<ResourceType>()?;
        let external_key = obj
            .get("externalKey")
            .and_then(Value::as_str)
            .ok_or("missing externalKey")?
            .to_string();
        let gameday_id = obj
            .get("gamedayId")
            .and_then(Value::as_str)
            .ok_or("missing gamedayId")?
            .to_string();
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let last_updated = obj
            .get("lastUpdated")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let mut identity = IndexMap::new();
        for field in resource_type.identity_fields() {
            if *field == "_id" {
                continue;
            }
            if let Some(value) = obj.get(*field) {
                identity.insert(field.to_string(), value.clone());
            }
        }

        let mut neighbors = IndexMap::new();
        for neighbor in ALL_RESOURCE_TYPES {
            let keys = obj.get(neighbor.keys_field()).and_then(Value::as_object);
            let ids = obj.get(neighbor.ids_field()).and_then(Value::as_array);
            if keys.is_none() && ids.is_none() {
                continue;
            }
            let mut refs = NeighborRefs::default();
            if let Some(ids) = ids {
                for id in ids {
                    if let Some(id) = id.as_str() {
                        refs.ids.insert(id.to_string());
                    }
                }
            }
            if let Some(keys) = keys {
                for (key, id) in keys {
                    if let Some(id) = id.as_str() {
                        refs.keys.insert(key.clone(), id.to_string());
                    }
                }
            }
            neighbors.insert(neighbor, refs);
        }

        Ok(Self {
            resource_type,
            external_key,
            gameday_id,
            name,
            identity,
            neighbors,
            last_updated,
        })
    }
}
