// Copyright 2025 Cowboy AI, LLC.

//! Resource types and scoping policy
//!
//! The entity universe is closed: twelve sports-domain types, each with a
//! home collection, a pair of neighbor field names used inside aggregation
//! records, and a scope class. The scope class drives the route regime at
//! read time: competition-scoped roots must not re-enter competition scope
//! through a non-competition-scoped type, and non-competition-scoped roots
//! must not traverse between two competition-scoped types.

use crate::storage::SortOrder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of entity types in the document store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    /// A competition (tournament, league season)
    Competition,
    /// A stage within a competition (group phase, knockout round)
    Stage,
    /// A scheduled event (match, race, heat)
    Event,
    /// A team
    Team,
    /// A venue
    Venue,
    /// A club
    Club,
    /// A sports governing organisation
    Sgo,
    /// A nation
    Nation,
    /// A sports person (player, athlete)
    SportsPerson,
    /// A staff affiliation of a sports person with a team, club or nation
    Staff,
    /// A ranking entry for a team or sports person within a stage or event
    Ranking,
    /// A key moment within an event
    KeyMoment,
}

/// All resource types, in the order used for stable iteration.
pub const ALL_RESOURCE_TYPES: [ResourceType; 12] = [
    ResourceType::Competition,
    ResourceType::Stage,
    ResourceType::Event,
    ResourceType::Team,
    ResourceType::Venue,
    ResourceType::Club,
    ResourceType::Sgo,
    ResourceType::Nation,
    ResourceType::SportsPerson,
    ResourceType::Staff,
    ResourceType::Ranking,
    ResourceType::KeyMoment,
];

impl ResourceType {
    /// Wire name, as stored in `resourceType` fields.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ResourceType::Competition => "competition",
            ResourceType::Stage => "stage",
            ResourceType::Event => "event",
            ResourceType::Team => "team",
            ResourceType::Venue => "venue",
            ResourceType::Club => "club",
            ResourceType::Sgo => "sgo",
            ResourceType::Nation => "nation",
            ResourceType::SportsPerson => "sportsPerson",
            ResourceType::Staff => "staff",
            ResourceType::Ranking => "ranking",
            ResourceType::KeyMoment => "keyMoment",
        }
    }

    /// Home collection name.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceType::Competition => "competitions",
            ResourceType::Stage => "stages",
            ResourceType::Event => "events",
            ResourceType::Team => "teams",
            ResourceType::Venue => "venues",
            ResourceType::Club => "clubs",
            ResourceType::Sgo => "sgos",
            ResourceType::Nation => "nations",
            ResourceType::SportsPerson => "sportsPersons",
            ResourceType::Staff => "staff",
            ResourceType::Ranking => "rankings",
            ResourceType::KeyMoment => "keyMoments",
        }
    }

    /// Field name for this type's id list inside an aggregation record.
    pub fn ids_field(&self) -> &'static str {
        match self {
            ResourceType::Competition => "competitions",
            ResourceType::Stage => "stages",
            ResourceType::Event => "events",
            ResourceType::Team => "teams",
            ResourceType::Venue => "venues",
            ResourceType::Club => "clubs",
            ResourceType::Sgo => "sgos",
            ResourceType::Nation => "nations",
            ResourceType::SportsPerson => "sportsPersons",
            ResourceType::Staff => "staff",
            ResourceType::Ranking => "rankings",
            ResourceType::KeyMoment => "keyMoments",
        }
    }

    /// Field name for this type's externalKey-to-id map inside an
    /// aggregation record.
    pub fn keys_field(&self) -> &'static str {
        match self {
            ResourceType::Competition => "competitionKeys",
            ResourceType::Stage => "stageKeys",
            ResourceType::Event => "eventKeys",
            ResourceType::Team => "teamKeys",
            ResourceType::Venue => "venueKeys",
            ResourceType::Club => "clubKeys",
            ResourceType::Sgo => "sgoKeys",
            ResourceType::Nation => "nationKeys",
            ResourceType::SportsPerson => "sportsPersonKeys",
            ResourceType::Staff => "staffKeys",
            ResourceType::Ranking => "rankingKeys",
            ResourceType::KeyMoment => "keyMomentKeys",
        }
    }

    /// Whether the type lives inside a competition's scope.
    pub fn is_competition_scoped(&self) -> bool {
        matches!(
            self,
            ResourceType::Competition
                | ResourceType::Stage
                | ResourceType::Event
                | ResourceType::Team
                | ResourceType::Staff
                | ResourceType::Ranking
                | ResourceType::KeyMoment
        )
    }

    /// Whether the type's external identity is a compound key.
    pub fn has_compound_key(&self) -> bool {
        matches!(
            self,
            ResourceType::Ranking | ResourceType::Staff | ResourceType::KeyMoment
        )
    }

    /// Identity fields projected when resolving neighbors of this type. The
    /// `_id` column is always included; the rest are the fields the codec
    /// needs to compose the type's external key.
    pub fn identity_fields(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Ranking => &[
                "_id",
                "externalStageKey",
                "externalEventKey",
                "externalTeamKey",
                "externalSportsPersonKey",
                "dateTimeLabel",
                "rank",
            ],
            ResourceType::Staff => &[
                "_id",
                "externalSportsPersonKey",
                "externalTeamKey",
                "externalClubKey",
                "externalNationKey",
            ],
            ResourceType::KeyMoment => &["_id", "dateTime", "externalEventKey", "type", "subType"],
            _ => &["_id", "_externalId", "_externalIdScope"],
        }
    }

    /// Default sort applied when materializing documents from the type's
    /// home collection.
    pub fn default_sort(&self) -> &'static [(&'static str, SortOrder)] {
        match self {
            ResourceType::Competition => &[("start", SortOrder::Desc), ("_id", SortOrder::Asc)],
            ResourceType::Event | ResourceType::KeyMoment => {
                &[("dateTime", SortOrder::Desc), ("_id", SortOrder::Asc)]
            }
            ResourceType::Team
            | ResourceType::Venue
            | ResourceType::Club
            | ResourceType::Nation
            | ResourceType::Sgo => &[("name", SortOrder::Desc), ("_id", SortOrder::Asc)],
            ResourceType::SportsPerson | ResourceType::Staff => {
                &[("lastName", SortOrder::Desc), ("_id", SortOrder::Asc)]
            }
            ResourceType::Ranking => &[
                ("externalStageKey", SortOrder::Desc),
                ("externalEventKey", SortOrder::Desc),
                ("rank", SortOrder::Desc),
                ("_id", SortOrder::Asc),
            ],
            ResourceType::Stage => &[("_id", SortOrder::Asc)],
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_RESOURCE_TYPES
            .into_iter()
            .find(|rt| rt.wire_name() == s)
            .ok_or_else(|| format!("unknown resource type: {s}"))
    }
}
