// Copyright 2025 Cowboy AI, LLC.

//! In-memory document store
//!
//! Reference implementation of [`DocumentStore`] used by the test suites.
//! Collections are ordered vectors of JSON documents, so every operation is
//! deterministic: filters scan in insertion order, set-addition preserves
//! first-seen order, and sorts are stable.

use super::{
    BulkWriteReport, Document, DocumentStore, Filter, GroupSpec, PipelineStage, SortOrder,
    StorageError, UpdateSpec, WriteOp,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type Collections = IndexMap<String, Vec<Document>>;

/// In-memory [`DocumentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a collection, creating the collection on first
    /// use. Fixture helper; writers in production go through `bulk_write`.
    pub async fn insert(&self, collection: &str, doc: Document) {
        let mut cols = self.collections.write().await;
        cols.entry(collection.to_string()).or_default().push(doc);
    }

    /// Insert several documents in order.
    pub async fn insert_many(&self, collection: &str, docs: Vec<Document>) {
        let mut cols = self.collections.write().await;
        cols.entry(collection.to_string()).or_default().extend(docs);
    }

    /// Snapshot a collection's documents (test assertions).
    pub async fn dump(&self, collection: &str) -> Vec<Document> {
        let cols = self.collections.read().await;
        cols.get(collection).cloned().unwrap_or_default()
    }
}

/// Resolve a dotted path against a document. Map keys containing separator
/// bytes are never addressed through paths, so a plain `.` split is safe here.
fn path_get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn path_set(doc: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = doc;
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            return;
        }
        current = current
            .as_object_mut()
            .expect("checked object")
            .entry(segment.to_string())
            .or_insert_with(|| json!({}));
    }
    if let Some(obj) = current.as_object_mut() {
        obj.insert(segments[segments.len() - 1].to_string(), value);
    }
}

/// Document-database equality: equal values match, and an array field matches
/// a scalar filter value it contains.
fn value_matches(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(actual) => {
            actual == expected
                || actual
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| item == expected))
        }
    }
}

fn eval_filter(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Eq(path, expected) => value_matches(path_get(doc, path), expected),
        Filter::In(path, values) => values
            .iter()
            .any(|expected| value_matches(path_get(doc, path), expected)),
        Filter::Exists(path, present) => path_get(doc, path).is_some() == *present,
        Filter::And(filters) => filters.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(filters) => filters.iter().any(|f| eval_filter(doc, f)),
    }
}

/// Total order over JSON values for sorting: null < bool < number < string <
/// array < object. Missing fields sort as null.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = cmp_values(xi, yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn sort_docs(docs: &mut [Document], keys: &[(String, SortOrder)]) {
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let av = path_get(a, field).cloned().unwrap_or(Value::Null);
            let bv = path_get(b, field).cloned().unwrap_or(Value::Null);
            let ord = match order {
                SortOrder::Asc => cmp_values(&av, &bv),
                SortOrder::Desc => cmp_values(&bv, &av),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn project_doc(doc: &Value, fields: &[String]) -> Value {
    let mut out = Map::new();
    if let Some(obj) = doc.as_object() {
        for field in fields {
            if let Some(value) = obj.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn unwind_docs(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::new();
    for doc in docs {
        let Some(Value::Array(items)) = path_get(&doc, path).cloned() else {
            continue;
        };
        for item in items {
            let mut clone = doc.clone();
            path_set(&mut clone, path, item);
            out.push(clone);
        }
    }
    out
}

fn group_docs(docs: &[Document], spec: &GroupSpec) -> Document {
    let mut out = Map::new();
    out.insert("_id".to_string(), Value::Null);
    for (output, source) in &spec.add_to_set {
        let mut seen: Vec<Value> = Vec::new();
        for doc in docs {
            if let Some(value) = path_get(doc, source) {
                if !seen.contains(value) {
                    seen.push(value.clone());
                }
            }
        }
        out.insert(output.clone(), Value::Array(seen));
    }
    Value::Object(out)
}

fn lookup_docs(
    docs: Vec<Document>,
    foreign: &[Document],
    local_field: &str,
    foreign_field: &str,
    as_field: &str,
) -> Vec<Document> {
    docs.into_iter()
        .map(|mut doc| {
            let locals: Vec<Value> = match path_get(&doc, local_field) {
                Some(Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            };
            let matches: Vec<Value> = foreign
                .iter()
                .filter(|fdoc| {
                    locals
                        .iter()
                        .any(|local| value_matches(path_get(fdoc, foreign_field), local))
                })
                .cloned()
                .collect();
            path_set(&mut doc, as_field, Value::Array(matches));
            doc
        })
        .collect()
}

/// A deferred merge write produced while executing a pipeline.
struct MergeWrite {
    into: String,
    on: Vec<String>,
    docs: Vec<Document>,
}

fn run_pipeline(
    cols: &Collections,
    mut docs: Vec<Document>,
    pipeline: &[PipelineStage],
    merges: &mut Vec<MergeWrite>,
) -> Result<Vec<Document>, StorageError> {
    for stage in pipeline {
        docs = match stage {
            PipelineStage::Match(filter) => docs
                .into_iter()
                .filter(|doc| eval_filter(doc, filter))
                .collect(),
            PipelineStage::Project(fields) => {
                docs.iter().map(|doc| project_doc(doc, fields)).collect()
            }
            PipelineStage::Unwind { path } => unwind_docs(docs, path),
            PipelineStage::Group(spec) => vec![group_docs(&docs, spec)],
            PipelineStage::Facet(branches) => {
                let mut out = Map::new();
                for (name, branch) in branches {
                    let produced = run_pipeline(cols, docs.clone(), branch, merges)?;
                    out.insert(name.clone(), Value::Array(produced));
                }
                vec![Value::Object(out)]
            }
            PipelineStage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let foreign = cols.get(from).map(Vec::as_slice).unwrap_or(&[]);
                lookup_docs(docs, foreign, local_field, foreign_field, as_field)
            }
            PipelineStage::Sort(keys) => {
                let mut sorted = docs;
                sort_docs(&mut sorted, keys);
                sorted
            }
            PipelineStage::Limit(n) => {
                let mut limited = docs;
                limited.truncate(*n);
                limited
            }
            PipelineStage::Merge { into, on } => {
                if on.is_empty() {
                    return Err(StorageError::UnsupportedPipeline(
                        "merge requires at least one `on` field".to_string(),
                    ));
                }
                merges.push(MergeWrite {
                    into: into.clone(),
                    on: on.clone(),
                    docs,
                });
                Vec::new()
            }
        };
    }
    Ok(docs)
}

fn apply_merge(cols: &mut Collections, write: MergeWrite) {
    let target = cols.entry(write.into).or_default();
    for doc in write.docs {
        let position = target.iter().position(|existing| {
            write.on.iter().all(|field| {
                path_get(existing, field).unwrap_or(&Value::Null)
                    == path_get(&doc, field).unwrap_or(&Value::Null)
            })
        });
        match position {
            Some(idx) => {
                // replace wholesale, keeping the target's _id when the
                // replacement does not carry one
                let mut replacement = doc;
                if path_get(&replacement, "_id").is_none() {
                    if let Some(id) = path_get(&target[idx], "_id").cloned() {
                        path_set(&mut replacement, "_id", id);
                    }
                }
                target[idx] = replacement;
            }
            None => target.push(doc),
        }
    }
}

/// Upserted documents get a generated `_id` when neither the filter nor the
/// update supplied one, as a document database would.
fn mint_id(doc: &mut Value) {
    if path_get(doc, "_id").is_none() {
        path_set(doc, "_id", Value::String(Uuid::new_v4().to_string()));
    }
}

/// Collect the equality fields of a filter as the seed for an upserted
/// document.
fn filter_seed(filter: &Filter, seed: &mut Map<String, Value>) {
    match filter {
        Filter::Eq(path, value) if !path.contains('.') => {
            seed.insert(path.clone(), value.clone());
        }
        Filter::And(filters) => {
            for f in filters {
                filter_seed(f, seed);
            }
        }
        _ => {}
    }
}

fn apply_update(doc: &mut Value, update: &UpdateSpec, inserting: bool) {
    if inserting {
        for (field, value) in &update.set_on_insert {
            path_set(doc, field, value.clone());
        }
    }
    for (field, value) in &update.set {
        path_set(doc, field, value.clone());
    }
    for (field, value) in &update.add_to_set {
        let existing = path_get(doc, field).cloned();
        let mut items = match existing {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        if !items.contains(value) {
            items.push(value.clone());
        }
        path_set(doc, field, Value::Array(items));
    }
    for (field, value) in &update.pull {
        if let Some(Value::Array(items)) = path_get(doc, field).cloned() {
            let kept: Vec<Value> = items.into_iter().filter(|item| item != value).collect();
            path_set(doc, field, Value::Array(kept));
        }
    }
    for field in &update.unset {
        if let Some(obj) = doc.as_object_mut() {
            obj.remove(field);
        }
    }
    for (field, key, value) in &update.set_map_entry {
        let mut map = match path_get(doc, field).cloned() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(key.clone(), value.clone());
        path_set(doc, field, Value::Object(map));
    }
    for (field, key) in &update.unset_map_entry {
        if let Some(Value::Object(mut map)) = path_get(doc, field).cloned() {
            map.remove(key);
            path_set(doc, field, Value::Object(map));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError> {
        let cols = self.collections.read().await;
        Ok(cols
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| eval_filter(doc, filter)).cloned()))
    }

    async fn count_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<u64, StorageError> {
        let cols = self.collections.read().await;
        Ok(cols
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| eval_filter(doc, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &[PipelineStage],
    ) -> Result<Vec<Document>, StorageError> {
        let mut merges = Vec::new();
        let output = {
            let cols = self.collections.read().await;
            let input = cols.get(collection).cloned().unwrap_or_default();
            run_pipeline(&cols, input, pipeline, &mut merges)?
        };
        if !merges.is_empty() {
            let mut cols = self.collections.write().await;
            for write in merges {
                apply_merge(&mut cols, write);
            }
        }
        Ok(output)
    }

    async fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
    ) -> Result<BulkWriteReport, StorageError> {
        let mut cols = self.collections.write().await;
        let docs = cols.entry(collection.to_string()).or_default();
        let mut report = BulkWriteReport::default();
        for op in ops {
            match op {
                WriteOp::ReplaceOne {
                    filter,
                    replacement,
                    upsert,
                } => {
                    let position = docs.iter().position(|doc| eval_filter(doc, &filter));
                    match position {
                        Some(idx) => {
                            let mut replacement = replacement;
                            if path_get(&replacement, "_id").is_none() {
                                if let Some(id) = path_get(&docs[idx], "_id").cloned() {
                                    path_set(&mut replacement, "_id", id);
                                }
                            }
                            docs[idx] = replacement;
                            report.matched += 1;
                            report.modified += 1;
                        }
                        None if upsert => {
                            let mut seed = Map::new();
                            filter_seed(&filter, &mut seed);
                            let mut doc = Value::Object(seed);
                            if let Some(obj) = replacement.as_object() {
                                for (k, v) in obj {
                                    path_set(&mut doc, k, v.clone());
                                }
                            }
                            mint_id(&mut doc);
                            docs.push(doc);
                            report.upserted += 1;
                        }
                        None => {}
                    }
                }
                WriteOp::UpdateOne {
                    filter,
                    update,
                    upsert,
                } => {
                    let position = docs.iter().position(|doc| eval_filter(doc, &filter));
                    match position {
                        Some(idx) => {
                            apply_update(&mut docs[idx], &update, false);
                            report.matched += 1;
                            report.modified += 1;
                        }
                        None if upsert => {
                            let mut seed = Map::new();
                            filter_seed(&filter, &mut seed);
                            let mut doc = Value::Object(seed);
                            apply_update(&mut doc, &update, true);
                            mint_id(&mut doc);
                            docs.push(doc);
                            report.upserted += 1;
                        }
                        None => {}
                    }
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn store_with(docs: Vec<(&str, Document)>) -> MemoryStore {
        let store = MemoryStore::new();
        for (collection, doc) in docs {
            store.insert(collection, doc).await;
        }
        store
    }

    #[test]
    fn find_one_scans_in_insertion_order() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.insert("teams", json!({"_id": "a", "name": "Ants"})).await;
            store.insert("teams", json!({"_id": "b", "name": "Ants"})).await;

            let found = store
                .find_one("teams", &Filter::eq("name", "Ants"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(found["_id"], "a");
        });
    }

    #[tokio::test]
    async fn equality_matches_array_containment() {
        let store = store_with(vec![(
            "teams",
            json!({"_id": "t1", "venues": ["v1[:]uefa", "v2[:]uefa"]}),
        )]).await;
        let found = store
            .find_one("teams", &Filter::eq("venues", "v2[:]uefa"))
            .await
            .unwrap();
        assert!(found.is_some());
        let missing = store
            .find_one("teams", &Filter::eq("venues", "v3[:]uefa"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn unwind_group_unions_with_first_seen_order() {
        let store = store_with(vec![
            ("agg", json!({"resourceType": "stage", "gamedayId": "s1", "events": ["e2", "e1"]})),
            ("agg", json!({"resourceType": "stage", "gamedayId": "s2", "events": ["e1", "e3"]})),
        ]).await;
        let out = store
            .aggregate(
                "agg",
                &[
                    PipelineStage::Match(Filter::eq("resourceType", "stage")),
                    PipelineStage::Unwind {
                        path: "events".to_string(),
                    },
                    PipelineStage::Group(GroupSpec {
                        add_to_set: vec![("ids".to_string(), "events".to_string())],
                    }),
                ],
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["ids"], json!(["e2", "e1", "e3"]));
    }

    #[tokio::test]
    async fn facet_runs_branches_over_same_input() {
        let store = store_with(vec![
            ("agg", json!({"resourceType": "stage", "gamedayId": "s1", "events": ["e1"]})),
            ("agg", json!({"resourceType": "event", "gamedayId": "e1", "teams": ["t1"]})),
        ]).await;
        let mut branches = IndexMap::new();
        branches.insert(
            "stages".to_string(),
            vec![PipelineStage::Match(Filter::eq("resourceType", "stage"))],
        );
        branches.insert(
            "events".to_string(),
            vec![PipelineStage::Match(Filter::eq("resourceType", "event"))],
        );
        let out = store
            .aggregate("agg", &[PipelineStage::Facet(branches)])
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["stages"].as_array().unwrap().len(), 1);
        assert_eq!(out[0]["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookup_joins_left_outer() {
        let store = store_with(vec![
            ("events", json!({"_id": "e1", "teams": ["t1[:]uefa", "t9[:]uefa"]})),
            ("teams", json!({"_id": "gd-t1", "key": "t1[:]uefa"})),
        ]).await;
        let out = store
            .aggregate(
                "events",
                &[PipelineStage::Lookup {
                    from: "teams".to_string(),
                    local_field: "teams".to_string(),
                    foreign_field: "key".to_string(),
                    as_field: "resolved".to_string(),
                }],
            )
            .await
            .unwrap();
        let resolved = out[0]["resolved"].as_array().unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0]["_id"], "gd-t1");
    }

    #[tokio::test]
    async fn merge_replaces_on_identity_and_inserts_otherwise() {
        let store = store_with(vec![
            ("staging", json!({"resourceType": "stage", "externalKey": "s1[:]x", "name": "new"})),
            ("staging", json!({"resourceType": "stage", "externalKey": "s2[:]x", "name": "born"})),
            ("agg", json!({"resourceType": "stage", "externalKey": "s1[:]x", "name": "old"})),
        ]).await;
        let out = store
            .aggregate(
                "staging",
                &[PipelineStage::Merge {
                    into: "agg".to_string(),
                    on: vec!["resourceType".to_string(), "externalKey".to_string()],
                }],
            )
            .await
            .unwrap();
        assert!(out.is_empty());
        let agg = store.dump("agg").await;
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0]["name"], "new");
        assert_eq!(agg[1]["name"], "born");
    }

    #[tokio::test]
    async fn sort_is_stable_with_multiple_keys() {
        let store = store_with(vec![
            ("teams", json!({"_id": "b", "name": "Lions"})),
            ("teams", json!({"_id": "a", "name": "Lions"})),
            ("teams", json!({"_id": "c", "name": "Ants"})),
        ]).await;
        let out = store
            .aggregate(
                "teams",
                &[PipelineStage::Sort(vec![
                    ("name".to_string(), SortOrder::Desc),
                    ("_id".to_string(), SortOrder::Asc),
                ])],
            )
            .await
            .unwrap();
        let ids: Vec<&str> = out.iter().map(|d| d["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn update_one_upsert_seeds_from_filter_and_set_on_insert() {
        let store = MemoryStore::new();
        let filter = Filter::And(vec![
            Filter::eq("resourceType", "stage"),
            Filter::eq("externalKey", "s1[:]x"),
        ]);
        let update = UpdateSpec::new()
            .add_to_set("competitions", "gd-c1")
            .set_map_entry("competitionKeys", "289175[:]fifa", "gd-c1")
            .set_on_insert("gamedayId", "gd-s1");
        let report = store
            .bulk_write(
                "agg",
                vec![WriteOp::UpdateOne {
                    filter: filter.clone(),
                    update,
                    upsert: true,
                }],
            )
            .await
            .unwrap();
        assert_eq!(report.upserted, 1);

        let doc = store.find_one("agg", &filter).await.unwrap().unwrap();
        assert_eq!(doc["gamedayId"], "gd-s1");
        assert_eq!(doc["competitions"], json!(["gd-c1"]));
        assert_eq!(doc["competitionKeys"]["289175[:]fifa"], "gd-c1");

        // second application is idempotent for set-valued fields
        let update = UpdateSpec::new()
            .add_to_set("competitions", "gd-c1")
            .set_map_entry("competitionKeys", "289175[:]fifa", "gd-c1");
        store
            .bulk_write(
                "agg",
                vec![WriteOp::UpdateOne {
                    filter: filter.clone(),
                    update,
                    upsert: true,
                }],
            )
            .await
            .unwrap();
        let doc = store.find_one("agg", &filter).await.unwrap().unwrap();
        assert_eq!(doc["competitions"], json!(["gd-c1"]));
    }

    #[tokio::test]
    async fn update_pull_and_unset_map_entry() {
        let store = store_with(vec![(
            "agg",
            json!({
                "resourceType": "stage",
                "externalKey": "s1[:]x",
                "competitions": ["gd-c1", "gd-c2"],
                "competitionKeys": {"a[:]x": "gd-c1", "b[:]x": "gd-c2"}
            }),
        )]).await;
        let update = UpdateSpec::new()
            .pull("competitions", "gd-c1")
            .unset_map_entry("competitionKeys", "a[:]x");
        store
            .bulk_write(
                "agg",
                vec![WriteOp::UpdateOne {
                    filter: Filter::eq("externalKey", "s1[:]x"),
                    update,
                    upsert: false,
                }],
            )
            .await
            .unwrap();
        let doc = store
            .find_one("agg", &Filter::eq("externalKey", "s1[:]x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["competitions"], json!(["gd-c2"]));
        assert_eq!(doc["competitionKeys"], json!({"b[:]x": "gd-c2"}));
    }

    #[tokio::test]
    async fn replace_one_keeps_existing_id() {
        let store = store_with(vec![(
            "agg",
            json!({"_id": "x1", "resourceType": "team", "externalKey": "t1[:]u", "name": "old"}),
        )]).await;
        store
            .bulk_write(
                "agg",
                vec![WriteOp::ReplaceOne {
                    filter: Filter::eq("externalKey", "t1[:]u"),
                    replacement: json!({"resourceType": "team", "externalKey": "t1[:]u", "name": "new"}),
                    upsert: true,
                }],
            )
            .await
            .unwrap();
        let doc = store
            .find_one("agg", &Filter::eq("externalKey", "t1[:]u"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["_id"], "x1");
        assert_eq!(doc["name"], "new");
    }
}
