// Copyright 2025 Cowboy AI, LLC.

//! Walkthrough: seed a small world, cascade a competition, fetch a
//! neighborhood.
//!
//! Run with: `cargo run --example index_walkthrough`

use gameday_xref::{
    FetchRequest, IndexConfig, MemoryStore, ResourceType, RouteSpec, XrefIndex,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> gameday_xref::AggregationResult<()> {
    let store = Arc::new(MemoryStore::new());
    seed(&store).await;

    let index = XrefIndex::new(Arc::clone(&store), IndexConfig::default());

    // write side: the competition changed, rebuild its closure
    let report = index
        .rebuild_transitively(ResourceType::Competition, "289175[:]fifa")
        .await?;
    let (attempted, completed, failed, skipped) = report.counts();
    println!("cascade: attempted={attempted} completed={completed} failed={failed} skipped={skipped}");
    println!("records materialized: {}", index.record_count().await?);

    // read side: stages and governing bodies through explicit routes
    let request = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
        .with_include(ResourceType::Stage)
        .with_include(ResourceType::Sgo)
        .with_budget(20)
        .with_routes(vec![
            RouteSpec {
                key: "directStages".to_string(),
                to: ResourceType::Stage,
                via: vec!["competition.stages->stage".to_string()],
            },
            RouteSpec {
                key: "directSgos".to_string(),
                to: ResourceType::Sgo,
                via: vec!["competition.sgos->sgo".to_string()],
            },
        ]);
    let response = index.fetch(&request).await?;
    for (resource_type, result) in &response.results {
        println!(
            "{resource_type}: {} items, {} overflow",
            result.items.len(),
            result.overflow.overflow_ids.len()
        );
    }

    // read side again, this time with derived routes and a tight budget
    let request = FetchRequest::new(ResourceType::Competition, "289175[:]fifa")
        .with_include(ResourceType::Team)
        .with_budget(1);
    let response = index.fetch(&request).await?;
    let teams = &response.results[&ResourceType::Team];
    println!(
        "teams under budget 1: {} materialized, {} left for paging",
        teams.items.len(),
        teams.overflow.overflow_ids.len()
    );
    Ok(())
}

async fn seed(store: &MemoryStore) {
    store
        .insert(
            "competitions",
            json!({
                "_id": "gd-c1",
                "resourceType": "competition",
                "_externalId": "289175",
                "_externalIdScope": "fifa",
                "name": "World Cup",
                "start": "2026-06-11",
                "sgos": ["g1[:]fifa"]
            }),
        )
        .await;
    store
        .insert(
            "sgos",
            json!({
                "_id": "gd-g1",
                "resourceType": "sgo",
                "_externalId": "g1",
                "_externalIdScope": "fifa",
                "name": "FIFA",
                "sgos": []
            }),
        )
        .await;
    store
        .insert_many(
            "stages",
            vec![
                json!({
                    "_id": "gd-s1",
                    "resourceType": "stage",
                    "_externalId": "s1",
                    "_externalIdScope": "fifa",
                    "name": "Group A",
                    "externalCompetitionKey": "289175[:]fifa"
                }),
                json!({
                    "_id": "gd-s2",
                    "resourceType": "stage",
                    "_externalId": "s2",
                    "_externalIdScope": "fifa",
                    "name": "Group B",
                    "externalCompetitionKey": "289175[:]fifa"
                }),
            ],
        )
        .await;
    store
        .insert(
            "events",
            json!({
                "_id": "gd-e1",
                "resourceType": "event",
                "_externalId": "e1",
                "_externalIdScope": "fifa",
                "name": "Matchday 1",
                "dateTime": "2026-06-12T18:00:00Z",
                "externalStageKey": "s1[:]fifa",
                "teams": ["t1[:]fifa", "t2[:]fifa"]
            }),
        )
        .await;
    store
        .insert_many(
            "teams",
            vec![
                json!({
                    "_id": "gd-t1",
                    "resourceType": "team",
                    "_externalId": "t1",
                    "_externalIdScope": "fifa",
                    "name": "Lions"
                }),
                json!({
                    "_id": "gd-t2",
                    "resourceType": "team",
                    "_externalId": "t2",
                    "_externalIdScope": "fifa",
                    "name": "Eagles"
                }),
            ],
        )
        .await;
}
