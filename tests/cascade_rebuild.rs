// Copyright 2025 Cowboy AI, LLC.

//! Cascade rebuilds over the fixture world.

mod support;

use gameday_xref::storage::DocumentStore;
use gameday_xref::{
    AggregationRecord, IndexConfig, MemoryStore, ResourceType, XrefIndex,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use support::{indexed_world, seed_world};

#[tokio::test]
async fn cascade_materializes_the_whole_closure() {
    let (_store, index) = indexed_world().await;
    let report = index
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await
        .unwrap();

    let expected = [
        (ResourceType::Competition, 1),
        (ResourceType::Sgo, 2),
        (ResourceType::Stage, 2),
        (ResourceType::Event, 3),
        (ResourceType::Ranking, 2),
        (ResourceType::Team, 3),
        (ResourceType::Staff, 1),
        (ResourceType::SportsPerson, 2),
        (ResourceType::Club, 1),
        (ResourceType::Nation, 1),
        (ResourceType::Venue, 2),
    ];
    for (resource_type, count) in expected {
        assert_eq!(
            report.completed_of(resource_type).len(),
            count,
            "completed count for {resource_type}"
        );
    }
    assert!(report.failed.is_empty());
    assert!(report.skipped.is_empty());
    assert_eq!(report.attempted.len(), report.completed.len());
}

#[tokio::test]
async fn every_materialized_record_satisfies_the_id_map_invariant() {
    let (store, index) = indexed_world().await;
    let docs = store.dump("aggregations").await;
    // twenty cascaded records plus the key-moment stub scheduled by the
    // event's reference maintenance
    assert_eq!(docs.len() as u64, index.record_count().await.unwrap());
    assert_eq!(docs.len(), 21);
    for doc in &docs {
        let record = AggregationRecord::from_document(doc).unwrap();
        record.check_invariants().unwrap_or_else(|reason| {
            panic!("invariant violated: {reason}");
        });
    }
}

#[tokio::test]
async fn compound_keyed_records_are_materialized_under_their_compound_keys() {
    let (store, _index) = indexed_world().await;
    let staff = store
        .find_one(
            "aggregations",
            &gameday_xref::record_filter(ResourceType::Staff, "p1[:]fifa[t]t1[:]fifa"),
        )
        .await
        .unwrap()
        .expect("staff record under its compound key");
    assert_eq!(staff["gamedayId"], "gd-st1");

    let stage_ranking = store
        .find_one(
            "aggregations",
            &gameday_xref::record_filter(
                ResourceType::Ranking,
                "s1[:]fifa[st]t1[:]fifa[@]2026-06-30[#]1",
            ),
        )
        .await
        .unwrap()
        .expect("stage ranking record");
    assert_eq!(stage_ranking["gamedayId"], "gd-r1");

    let event_ranking = store
        .find_one(
            "aggregations",
            &gameday_xref::record_filter(
                ResourceType::Ranking,
                "e1[:]fifa[ep]p1[:]fifa[@]2026-06-12[#]2",
            ),
        )
        .await
        .unwrap()
        .expect("event ranking record");
    assert_eq!(event_ranking["gamedayId"], "gd-r2");
}

#[tokio::test]
async fn cascade_is_idempotent_under_replay() {
    let (store, index) = indexed_world().await;
    let first = store.dump("aggregations").await.len();
    index
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await
        .unwrap();
    let second = store.dump("aggregations").await.len();
    assert_eq!(first, second);
}

#[tokio::test]
async fn back_pointers_survive_full_child_rebuilds() {
    let (store, _index) = indexed_world().await;
    // the stage was fully rebuilt during its phase, after the competition's
    // reference maintenance planted the back-pointer
    let stage = store
        .find_one(
            "aggregations",
            &gameday_xref::record_filter(ResourceType::Stage, "s1[:]fifa"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stage["competitions"], serde_json::json!(["gd-c1"]));
    assert_eq!(stage["competitionKeys"]["289175[:]fifa"], "gd-c1");

    // a team accumulates back-pointers from events, sgos and rankings
    let team = store
        .find_one(
            "aggregations",
            &gameday_xref::record_filter(ResourceType::Team, "t1[:]fifa"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(team["sgos"], serde_json::json!(["gd-g1"]));
    assert_eq!(team["rankings"], serde_json::json!(["gd-r1"]));
    let events = team["events"].as_array().unwrap();
    assert!(events.contains(&serde_json::json!("gd-e1")));
}

#[tokio::test]
async fn corrupt_entries_fail_without_stopping_siblings() {
    let store = Arc::new(MemoryStore::new());
    seed_world(&store).await;
    // corrupt g1's member references: its rebuild fails as malformed, the
    // rest of the cascade continues
    store
        .bulk_write(
            "sgos",
            vec![gameday_xref::storage::WriteOp::UpdateOne {
                filter: gameday_xref::storage::Filter::eq("_id", "gd-g1"),
                update: gameday_xref::storage::UpdateSpec::new()
                    .set("sgos", serde_json::json!(["missing-separator"])),
                upsert: false,
            }],
        )
        .await
        .unwrap();
    let index = XrefIndex::new(Arc::clone(&store), IndexConfig::default());
    let report = index
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    let failed = report.failed.first().unwrap();
    assert_eq!(failed.resource_type, ResourceType::Sgo);
    assert_eq!(failed.external_key, "g1[:]fifa");
    // stages, events and teams are unaffected by the governing-body failure
    assert_eq!(report.completed_of(ResourceType::Stage).len(), 2);
    assert_eq!(report.completed_of(ResourceType::Event).len(), 3);
    assert_eq!(report.completed_of(ResourceType::Team).len(), 3);
}

#[tokio::test]
async fn a_ghost_stage_reference_never_reaches_the_cascade() {
    let store = Arc::new(MemoryStore::new());
    seed_world(&store).await;
    // a stage referenced by an event but absent from its home collection:
    // reparent e3 onto a ghost stage
    store
        .bulk_write(
            "events",
            vec![gameday_xref::storage::WriteOp::UpdateOne {
                filter: gameday_xref::storage::Filter::eq("_id", "gd-e3"),
                update: gameday_xref::storage::UpdateSpec::new()
                    .set("externalStageKey", "ghost[:]fifa"),
                upsert: false,
            }],
        )
        .await
        .unwrap();
    let index = XrefIndex::new(Arc::clone(&store), IndexConfig::default());
    let report = index
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await
        .unwrap();

    // e3 now hangs off a stage that does not exist; the cascade never sees
    // it, and everything else still completes
    assert!(report.failed.is_empty());
    assert_eq!(report.completed_of(ResourceType::Event).len(), 2);

    // rebuilding the ghost stage directly reports not-found
    let outcome = index
        .rebuild_entity(ResourceType::Stage, "ghost[:]fifa")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        gameday_xref::RebuildOutcome::NotFound
    ));
}

#[tokio::test]
async fn disabled_types_are_skipped_with_their_downstream_left_unvisited() {
    let store = Arc::new(MemoryStore::new());
    seed_world(&store).await;
    let rebuilder = gameday_xref::Rebuilder::new(Arc::clone(&store), IndexConfig::default())
        .without_type(ResourceType::Staff);
    let cascade = gameday_xref::CascadeOrchestrator::new(rebuilder);
    let report = cascade
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await
        .unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        report.skipped.first().unwrap().resource_type,
        ResourceType::Staff
    );
    // sports persons still arrive through the team harvest
    assert_eq!(report.completed_of(ResourceType::SportsPerson).len(), 2);
}
