// Copyright 2025 Cowboy AI, LLC.

//! Shared world fixture for integration tests.
//!
//! One competition (`289175[:]fifa`) with two stages, three events, three
//! teams, two venues, two governing bodies (cyclically referencing each
//! other), rankings in both the stage and event variants, one staff
//! affiliation, two sports persons, a club and a nation.

use gameday_xref::{IndexConfig, MemoryStore, XrefIndex};
use serde_json::json;
use std::sync::Arc;

/// Seed every home collection of the test world.
pub async fn seed_world(store: &MemoryStore) {
    store
        .insert_many(
            "competitions",
            vec![json!({
                "_id": "gd-c1",
                "resourceType": "competition",
                "_externalId": "289175",
                "_externalIdScope": "fifa",
                "name": "World Cup",
                "start": "2026-06-11",
                "sgos": ["g1[:]fifa"]
            })],
        )
        .await;
    store
        .insert_many(
            "sgos",
            vec![
                json!({
                    "_id": "gd-g1",
                    "resourceType": "sgo",
                    "_externalId": "g1",
                    "_externalIdScope": "fifa",
                    "name": "FIFA",
                    "sgos": ["g2[:]fifa"],
                    "teams": ["t1[:]fifa"]
                }),
                json!({
                    "_id": "gd-g2",
                    "resourceType": "sgo",
                    "_externalId": "g2",
                    "_externalIdScope": "fifa",
                    "name": "UEFA",
                    "sgos": ["g1[:]fifa"],
                    "teams": ["t2[:]fifa"]
                }),
            ],
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
        .insert_many(
            "events",
            vec![
                json!({
                    "_id": "gd-e1",
                    "resourceType": "event",
                    "_externalId": "e1",
                    "_externalIdScope": "fifa",
                    "name": "Matchday 1",
                    "dateTime": "2026-06-12T18:00:00Z",
                    "externalStageKey": "s1[:]fifa",
                    "teams": ["t1[:]fifa", "t2[:]fifa"],
                    "venues": ["v1[:]fifa"],
                    "tags": [{"name": "broadcast"}, {"name": "internal"}],
                    "participants": [
                        {"externalTeamKey": "t1[:]fifa", "tags": [{"name": "home"}, {"name": "ops-1"}]},
                        {"externalSportsPersonKey": "p1[:]fifa", "tags": [{"name": "captain"}]}
                    ]
                }),
                json!({
                    "_id": "gd-e2",
                    "resourceType": "event",
                    "_externalId": "e2",
                    "_externalIdScope": "fifa",
                    "name": "Matchday 2",
                    "dateTime": "2026-06-13T18:00:00Z",
                    "externalStageKey": "s1[:]fifa",
                    "teams": ["t2[:]fifa", "t3[:]fifa"],
                    "venues": ["v1[:]fifa", "v2[:]fifa"]
                }),
                json!({
                    "_id": "gd-e3",
                    "resourceType": "event",
                    "_externalId": "e3",
                    "_externalIdScope": "fifa",
                    "name": "Matchday 3",
                    "dateTime": "2026-06-14T18:00:00Z",
                    "externalStageKey": "s2[:]fifa",
                    "teams": ["t3[:]fifa"]
                }),
            ],
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
                    "name": "Lions",
                    "sportsPersons": ["p1[:]fifa", "p2[:]fifa"],
                    "externalClubKey": "c1[:]fifa",
                    "nations": ["n1[:]fifa"],
                    "venues": ["v1[:]fifa"]
                }),
                json!({
                    "_id": "gd-t2",
                    "resourceType": "team",
                    "_externalId": "t2",
                    "_externalIdScope": "fifa",
                    "name": "Eagles",
                    "sportsPersons": ["p2[:]fifa"],
                    "nations": ["n1[:]fifa"],
                    "venues": ["v2[:]fifa"]
                }),
                json!({
                    "_id": "gd-t3",
                    "resourceType": "team",
                    "_externalId": "t3",
                    "_externalIdScope": "fifa",
                    "name": "Sharks",
                    "nations": ["n1[:]fifa"]
                }),
            ],
        )
        .await;
    store
        .insert_many(
            "venues",
            vec![
                json!({
                    "_id": "gd-v1",
                    "resourceType": "venue",
                    "_externalId": "v1",
                    "_externalIdScope": "fifa",
                    "name": "National Stadium"
                }),
                json!({
                    "_id": "gd-v2",
                    "resourceType": "venue",
                    "_externalId": "v2",
                    "_externalIdScope": "fifa",
                    "name": "Arena Two"
                }),
            ],
        )
        .await;
    store
        .insert_many(
            "rankings",
            vec![
                json!({
                    "_id": "gd-r1",
                    "resourceType": "ranking",
                    "externalStageKey": "s1[:]fifa",
                    "externalTeamKey": "t1[:]fifa",
                    "dateTimeLabel": "2026-06-30",
                    "rank": 1
                }),
                json!({
                    "_id": "gd-r2",
                    "resourceType": "ranking",
                    "externalEventKey": "e1[:]fifa",
                    "externalSportsPersonKey": "p1[:]fifa",
                    "dateTimeLabel": "2026-06-12",
                    "rank": 2
                }),
            ],
        )
        .await;
    store
        .insert_many(
            "staff",
            vec![json!({
                "_id": "gd-st1",
                "resourceType": "staff",
                "lastName": "Shaw",
                "firstName": "Mel",
                "externalSportsPersonKey": "p1[:]fifa",
                "externalTeamKey": "t1[:]fifa"
            })],
        )
        .await;
    store
        .insert_many(
            "sportsPersons",
            vec![
                json!({
                    "_id": "gd-p1",
                    "resourceType": "sportsPerson",
                    "_externalId": "p1",
                    "_externalIdScope": "fifa",
                    "lastName": "Kane",
                    "firstName": "H",
                    "externalNationKey": "n1[:]fifa",
                    "externalClubKey": "c1[:]fifa"
                }),
                json!({
                    "_id": "gd-p2",
                    "resourceType": "sportsPerson",
                    "_externalId": "p2",
                    "_externalIdScope": "fifa",
                    "lastName": "Abbas",
                    "firstName": "N",
                    "externalNationKey": "n1[:]fifa"
                }),
            ],
        )
        .await;
    store
        .insert_many(
            "clubs",
            vec![json!({
                "_id": "gd-cl1",
                "resourceType": "club",
                "_externalId": "c1",
                "_externalIdScope": "fifa",
                "name": "Lions FC",
                "externalNationKey": "n1[:]fifa"
            })],
        )
        .await;
    store
        .insert_many(
            "nations",
            vec![json!({
                "_id": "gd-n1",
                "resourceType": "nation",
                "_externalId": "n1",
                "_externalIdScope": "fifa",
                "name": "England",
                "venues": ["v1[:]fifa"]
            })],
        )
        .await;
    store
        .insert_many(
            "keyMoments",
            vec![json!({
                "_id": "gd-k1",
                "resourceType": "keyMoment",
                "dateTime": "2026-06-12T18:44:00.000Z",
                "externalEventKey": "e1[:]fifa",
                "type": "goal",
                "subType": "penalty"
            })],
        )
        .await;
}

/// A seeded world with its cascade already run: every reachable aggregation
/// record is materialized.
pub async fn indexed_world() -> (Arc<MemoryStore>, XrefIndex<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed_world(&store).await;
    let index = XrefIndex::new(Arc::clone(&store), IndexConfig::default());
    index
        .rebuild_transitively(
            gameday_xref::ResourceType::Competition,
            "289175[:]fifa",
        )
        .await
        .expect("cascade over the fixture world");
    (store, index)
}
