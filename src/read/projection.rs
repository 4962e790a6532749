// Copyright 2025 Cowboy AI, LLC.

//! Projection policy
//!
//! `fieldProjections` carries two groups, inclusions and exclusions, each
//! with an optional `all` map and per-type overrides. Keys are either simple
//! dotted paths (classic include/exclude directives) or compound keys such
//! as `tags>official>media*` and `participants.team.tags>heat*`, which
//! compile to array filters: match a tag whose `name` equals a literal entry
//! or starts with a `*`-suffixed prefix. The `team`/`sp` segment after
//! `participants` discriminates participant elements by which external key
//! pair they carry.
//!
//! Evaluation order is fixed so exclusions cannot be reintroduced:
//! exclusion transforms, inclusion transforms, inclusion projection,
//! exclusion projection. Exclusion wins. Caller-supplied maps are cloned,
//! never rewritten.

use crate::errors::{AggregationError, AggregationResult};
use crate::resource_type::ResourceType;
use crate::storage::Document;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Raw projection directives: field-path key to an active flag.
pub type ProjectionMap = BTreeMap<String, bool>;

/// One projection group (`inclusions` or `exclusions`) as supplied by the
/// caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionGroup {
    /// Directives applied to every type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<ProjectionMap>,
    /// Per-type overrides, keyed by resource type wire name
    #[serde(flatten)]
    pub per_type: BTreeMap<ResourceType, ProjectionMap>,
}

/// The `fieldProjections` request block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldProjections {
    /// Fields and array filters to keep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusions: Option<ProjectionGroup>,
    /// Fields and array filters to remove
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<ProjectionGroup>,
}

/// Which external key pair a participant element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    /// Elements carrying `externalTeamKey`
    Team,
    /// Elements carrying `externalSportsPersonKey`
    SportsPerson,
}

impl ParticipantKind {
    fn discriminant_field(&self) -> &'static str {
        match self {
            ParticipantKind::Team => "externalTeamKey",
            ParticipantKind::SportsPerson => "externalSportsPersonKey",
        }
    }
}

/// One step of a projection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Descend into an object field (arrays are mapped element-wise)
    Field(String),
    /// Restrict to participant elements of one kind
    Participants(ParticipantKind),
}

/// Name matcher of a compound projection key: exact entries plus
/// `*`-suffixed prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePredicate {
    /// Names matched literally
    pub exact: Vec<String>,
    /// Name prefixes (the trailing `*` stripped)
    pub prefixes: Vec<String>,
}

impl NamePredicate {
    /// Whether a tag name satisfies the predicate.
    pub fn matches(&self, name: &str) -> bool {
        self.exact.iter().any(|entry| entry == name)
            || self.prefixes.iter().any(|prefix| name.starts_with(prefix))
    }
}

/// A compiled projection directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionRule {
    /// Path steps from the document root
    pub segments: Vec<Segment>,
    /// Present on compound keys; the rule then filters the array at the path
    pub predicate: Option<NamePredicate>,
}

impl ProjectionRule {
    /// Parse a projection key. Compound keys carry `>`-separated name
    /// entries after the path; only compound keys interpret the
    /// `participants.team` / `participants.sp` discriminator.
    pub fn parse(key: &str) -> AggregationResult<Self> {
        let mut parts = key.split('>');
        let path = parts.next().unwrap_or_default();
        if path.is_empty() {
            return Err(AggregationError::bad_request(format!(
                "projection key {key:?} has an empty path"
            )));
        }
        let names: Vec<&str> = parts.collect();
        let predicate = if names.is_empty() {
            None
        } else {
            let mut predicate = NamePredicate::default();
            for name in names {
                if name.is_empty() {
                    return Err(AggregationError::bad_request(format!(
                        "projection key {key:?} has an empty filter entry"
                    )));
                }
                match name.strip_suffix('*') {
                    Some(prefix) if prefix.is_empty() => {
                        return Err(AggregationError::bad_request(format!(
                            "projection key {key:?} has a bare wildcard entry"
                        )))
                    }
                    Some(prefix) => predicate.prefixes.push(prefix.to_string()),
                    None => predicate.exact.push(name.to_string()),
                }
            }
            Some(predicate)
        };

        let raw_segments: Vec<&str> = path.split('.').collect();
        if raw_segments.iter().any(|segment| segment.is_empty()) {
            return Err(AggregationError::bad_request(format!(
                "projection key {key:?} has an empty path segment"
            )));
        }
        let mut segments = Vec::with_capacity(raw_segments.len());
        for (i, raw) in raw_segments.iter().enumerate() {
            let after_participants = i > 0 && raw_segments[i - 1] == "participants";
            let segment = match (*raw, predicate.is_some() && after_participants) {
                ("team", true) => Segment::Participants(ParticipantKind::Team),
                ("sp", true) => Segment::Participants(ParticipantKind::SportsPerson),
                _ => Segment::Field(raw.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self {
            segments,
            predicate,
        })
    }

    fn is_transform(&self) -> bool {
        self.predicate.is_some()
    }
}

#[derive(Debug, Clone, Default)]
struct CompiledGroup {
    all: Vec<ProjectionRule>,
    per_type: BTreeMap<ResourceType, Vec<ProjectionRule>>,
}

impl CompiledGroup {
    fn compile(group: Option<&ProjectionGroup>) -> AggregationResult<Self> {
        let mut compiled = Self::default();
        let Some(group) = group else {
            return Ok(compiled);
        };
        // clone the caller's maps; interpretation never rewrites them
        if let Some(all) = group.all.clone() {
            compiled.all = compile_map(&all)?;
        }
        for (resource_type, map) in group.per_type.clone() {
            compiled
                .per_type
                .insert(resource_type, compile_map(&map)?);
        }
        Ok(compiled)
    }

    fn rules_for(&self, resource_type: ResourceType) -> Vec<&ProjectionRule> {
        self.all
            .iter()
            .chain(
                self.per_type
                    .get(&resource_type)
                    .into_iter()
                    .flatten(),
            )
            .collect()
    }
}

fn compile_map(map: &ProjectionMap) -> AggregationResult<Vec<ProjectionRule>> {
    map.iter()
        .filter(|(_, active)| **active)
        .map(|(key, _)| ProjectionRule::parse(key))
        .collect()
}

/// Compiled projection policy, applied per document after fetch.
#[derive(Debug, Clone, Default)]
pub struct ProjectionPolicy {
    inclusions: CompiledGroup,
    exclusions: CompiledGroup,
}

impl ProjectionPolicy {
    /// Compile a request's `fieldProjections`. Inactive (false) directives
    /// are ignored; malformed keys are caller errors.
    pub fn compile(projections: Option<&FieldProjections>) -> AggregationResult<Self> {
        let Some(projections) = projections else {
            return Ok(Self::default());
        };
        Ok(Self {
            inclusions: CompiledGroup::compile(projections.inclusions.as_ref())?,
            exclusions: CompiledGroup::compile(projections.exclusions.as_ref())?,
        })
    }

    /// Apply the policy to one fetched document of the given type.
    pub fn apply(&self, resource_type: ResourceType, doc: &Document) -> Document {
        let mut doc = doc.clone();
        let exclusions = self.exclusions.rules_for(resource_type);
        let inclusions = self.inclusions.rules_for(resource_type);

        // 1. exclusion transforms remove matching array elements
        for rule in &exclusions {
            if let Some(predicate) = &rule.predicate {
                filter_at(&mut doc, &rule.segments, predicate, false);
            }
        }
        // 2. inclusion transforms keep only matching array elements
        for rule in &inclusions {
            if let Some(predicate) = &rule.predicate {
                filter_at(&mut doc, &rule.segments, predicate, true);
            }
        }
        // 3. inclusion projection keeps the listed simple paths
        let keep: Vec<&ProjectionRule> = inclusions
            .iter()
            .filter(|rule| !rule.is_transform())
            .copied()
            .collect();
        if !keep.is_empty() {
            let mut kept = Value::Object(Map::new());
            if let Some(id) = doc.get("_id") {
                kept["_id"] = id.clone();
            }
            for rule in keep {
                copy_path(&doc, &mut kept, &rule.segments);
            }
            // transforms already ran; the include list decides survivors
            doc = kept;
        }
        // 4. exclusion projection removes the listed simple paths last
        for rule in exclusions.iter().filter(|rule| !rule.is_transform()) {
            remove_path(&mut doc, &rule.segments);
        }
        doc
    }
}

/// Filter the array at the rule's path: in keep mode retain matching tag
/// elements, otherwise remove them. Elements without a string `name` never
/// match.
fn filter_at(value: &mut Value, segments: &[Segment], predicate: &NamePredicate, keep: bool) {
    let Some((head, rest)) = segments.split_first() else {
        if let Value::Array(items) = value {
            items.retain(|item| {
                let matched = item
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|name| predicate.matches(name))
                    .unwrap_or(false);
                matched == keep
            });
        }
        return;
    };
    match head {
        Segment::Field(field) => match value {
            Value::Object(map) => {
                if let Some(inner) = map.get_mut(field) {
                    filter_at(inner, rest, predicate, keep);
                }
            }
            Value::Array(items) => {
                for item in items {
                    filter_at(item, segments, predicate, keep);
                }
            }
            _ => {}
        },
        Segment::Participants(kind) => {
            if let Value::Array(items) = value {
                for item in items {
                    if item.get(kind.discriminant_field()).is_some() {
                        filter_at(item, rest, predicate, keep);
                    }
                }
            }
        }
    }
}

/// Copy the value at a simple path from `src` into `dst`, preserving object
/// nesting and projecting array elements element-wise.
fn copy_path(src: &Value, dst: &mut Value, segments: &[Segment]) {
    let Some((Segment::Field(field), rest)) = segments.split_first() else {
        return;
    };
    let Some(found) = src.get(field) else {
        return;
    };
    if rest.is_empty() {
        dst[field] = found.clone();
        return;
    }
    match found {
        Value::Object(_) => {
            if dst.get(field).is_none() {
                dst[field] = Value::Object(Map::new());
            }
            copy_path(found, &mut dst[field], rest);
        }
        Value::Array(items) => {
            let projected: Vec<Value> = items
                .iter()
                .map(|item| {
                    let mut shaped = Value::Object(Map::new());
                    copy_path(item, &mut shaped, rest);
                    shaped
                })
                .collect();
            dst[field] = Value::Array(projected);
        }
        _ => {}
    }
}

/// Remove the value at a simple path, descending arrays element-wise.
fn remove_path(value: &mut Value, segments: &[Segment]) {
    let Some((Segment::Field(field), rest)) = segments.split_first() else {
        return;
    };
    match value {
        Value::Object(map) => {
            if rest.is_empty() {
                map.remove(field);
            } else if let Some(inner) = map.get_mut(field) {
                remove_path(inner, rest);
            }
        }
        Value::Array(items) => {
            for item in items {
                remove_path(item, segments);
            }
        }
        _ => {}
    }
}
