// Copyright 2025 Cowboy AI, LLC.

//! Typed edge graph
//!
//! The directed multigraph over [`ResourceType`]s is a fixed declaration.
//! Each edge carries the field label under which the source stores its
//! references, plus the resolution strategy the record builder uses against
//! the home collections. Edge labels are canonical strings of the form
//! `from.field->to`.

use crate::resource_type::ResourceType;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// How the record builder resolves an edge's neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeResolution {
    /// The source document stores composed external-key strings (scalar or
    /// array) under `field`; neighbors are the target documents carrying
    /// those identities.
    Refs {
        /// Reference field on the source document
        field: &'static str,
    },
    /// Target documents store the source's composed external key (scalar or
    /// array) under `field`; neighbors are found by equality match.
    Reverse {
        /// Back-reference field on the target documents
        field: &'static str,
    },
}

/// A declared edge of the type graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Source type
    pub from: ResourceType,
    /// Field label under which the source stores the references
    pub field: &'static str,
    /// Target type
    pub to: ResourceType,
    /// Resolution strategy for the record builder
    pub resolution: EdgeResolution,
}

impl Edge {
    /// Canonical label `from.field->to`.
    pub fn label(&self) -> EdgeLabel {
        EdgeLabel {
            from: self.from,
            field: self.field.to_string(),
            to: self.to,
        }
    }
}

use self::EdgeResolution::{Refs, Reverse};
use crate::resource_type::ResourceType as Rt;

/// The fixed edge table. Order within a source type is the declaration
/// order, which is also the resolution order inside the record builder.
pub const EDGES: &[Edge] = &[
    // competition
    Edge { from: Rt::Competition, field: "stages", to: Rt::Stage, resolution: Reverse { field: "externalCompetitionKey" } },
    Edge { from: Rt::Competition, field: "sgos", to: Rt::Sgo, resolution: Refs { field: "sgos" } },
    // stage
    Edge { from: Rt::Stage, field: "events", to: Rt::Event, resolution: Reverse { field: "externalStageKey" } },
    Edge { from: Rt::Stage, field: "rankings", to: Rt::Ranking, resolution: Reverse { field: "externalStageKey" } },
    // event
    Edge { from: Rt::Event, field: "stages", to: Rt::Stage, resolution: Refs { field: "externalStageKey" } },
    Edge { from: Rt::Event, field: "teams", to: Rt::Team, resolution: Refs { field: "teams" } },
    Edge { from: Rt::Event, field: "venues", to: Rt::Venue, resolution: Refs { field: "venues" } },
    Edge { from: Rt::Event, field: "rankings", to: Rt::Ranking, resolution: Reverse { field: "externalEventKey" } },
    Edge { from: Rt::Event, field: "keyMoments", to: Rt::KeyMoment, resolution: Reverse { field: "externalEventKey" } },
    // team
    Edge { from: Rt::Team, field: "sportsPersons", to: Rt::SportsPerson, resolution: Refs { field: "sportsPersons" } },
    Edge { from: Rt::Team, field: "staff", to: Rt::Staff, resolution: Reverse { field: "externalTeamKey" } },
    Edge { from: Rt::Team, field: "clubs", to: Rt::Club, resolution: Refs { field: "externalClubKey" } },
    Edge { from: Rt::Team, field: "nations", to: Rt::Nation, resolution: Refs { field: "externalNationKey" } },
    Edge { from: Rt::Team, field: "venues", to: Rt::Venue, resolution: Refs { field: "venues" } },
    // staff
    Edge { from: Rt::Staff, field: "sportsPersons", to: Rt::SportsPerson, resolution: Refs { field: "externalSportsPersonKey" } },
    Edge { from: Rt::Staff, field: "teams", to: Rt::Team, resolution: Refs { field: "externalTeamKey" } },
    Edge { from: Rt::Staff, field: "clubs", to: Rt::Club, resolution: Refs { field: "externalClubKey" } },
    Edge { from: Rt::Staff, field: "nations", to: Rt::Nation, resolution: Refs { field: "externalNationKey" } },
    // sportsPerson
    Edge { from: Rt::SportsPerson, field: "nations", to: Rt::Nation, resolution: Refs { field: "externalNationKey" } },
    Edge { from: Rt::SportsPerson, field: "clubs", to: Rt::Club, resolution: Refs { field: "externalClubKey" } },
    // club
    Edge { from: Rt::Club, field: "nations", to: Rt::Nation, resolution: Refs { field: "externalNationKey" } },
    Edge { from: Rt::Club, field: "teams", to: Rt::Team, resolution: Reverse { field: "externalClubKey" } },
    // nation
    Edge { from: Rt::Nation, field: "venues", to: Rt::Venue, resolution: Refs { field: "venues" } },
    // venue
    Edge { from: Rt::Venue, field: "teams", to: Rt::Team, resolution: Reverse { field: "venues" } },
    // sgo
    Edge { from: Rt::Sgo, field: "sgos", to: Rt::Sgo, resolution: Refs { field: "sgos" } },
    Edge { from: Rt::Sgo, field: "teams", to: Rt::Team, resolution: Refs { field: "teams" } },
    Edge { from: Rt::Sgo, field: "competitions", to: Rt::Competition, resolution: Reverse { field: "sgos" } },
    // ranking
    Edge { from: Rt::Ranking, field: "stages", to: Rt::Stage, resolution: Refs { field: "externalStageKey" } },
    Edge { from: Rt::Ranking, field: "events", to: Rt::Event, resolution: Refs { field: "externalEventKey" } },
    Edge { from: Rt::Ranking, field: "teams", to: Rt::Team, resolution: Refs { field: "externalTeamKey" } },
    Edge { from: Rt::Ranking, field: "sportsPersons", to: Rt::SportsPerson, resolution: Refs { field: "externalSportsPersonKey" } },
    // keyMoment
    Edge { from: Rt::KeyMoment, field: "events", to: Rt::Event, resolution: Refs { field: "externalEventKey" } },
];

/// Outgoing edges of a type, in declaration order.
pub fn outgoing_edges(from: ResourceType) -> impl Iterator<Item = &'static Edge> {
    EDGES.iter().filter(move |edge| edge.from == from)
}

/// Look up the declared edge matching a parsed label, if any.
pub fn find_edge(label: &EdgeLabel) -> Option<&'static Edge> {
    EDGES.iter().find(|edge| {
        edge.from == label.from && edge.field == label.field && edge.to == label.to
    })
}

/// Errors produced by edge-label parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeLabelError {
    /// The `->` arrow was missing
    MissingArrow(String),
    /// The `from.field` part had no `.` separator
    MissingField(String),
    /// A side of the label named an unknown resource type
    UnknownType(String),
    /// A component was empty
    EmptyComponent(String),
}

impl Display for EdgeLabelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EdgeLabelError::MissingArrow(label) => {
                write!(f, "edge label {label:?} is missing '->'")
            }
            EdgeLabelError::MissingField(label) => {
                write!(f, "edge label {label:?} is missing the '.field' part")
            }
            EdgeLabelError::UnknownType(name) => {
                write!(f, "edge label names unknown resource type {name:?}")
            }
            EdgeLabelError::EmptyComponent(label) => {
                write!(f, "edge label {label:?} has an empty component")
            }
        }
    }
}

impl std::error::Error for EdgeLabelError {}

/// A parsed edge label `from.field->to` (value object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeLabel {
    /// Source type
    pub from: ResourceType,
    /// Field label
    pub field: String,
    /// Target type
    pub to: ResourceType,
}

impl EdgeLabel {
    /// Parse a canonical `from.field->to` label.
    pub fn parse(input: &str) -> Result<Self, EdgeLabelError> {
        let (head, to) = input
            .split_once("->")
            .ok_or_else(|| EdgeLabelError::MissingArrow(input.to_string()))?;
        let (from, field) = head
            .split_once('.')
            .ok_or_else(|| EdgeLabelError::MissingField(input.to_string()))?;
        if from.is_empty() || field.is_empty() || to.is_empty() {
            return Err(EdgeLabelError::EmptyComponent(input.to_string()));
        }
        let from = from
            .parse::<ResourceType>()
            .map_err(|_| EdgeLabelError::UnknownType(from.to_string()))?;
        let to = to
            .parse::<ResourceType>()
            .map_err(|_| EdgeLabelError::UnknownType(to.to_string()))?;
        Ok(Self {
            from,
            field: field.to_string(),
            to,
        })
    }
}

impl Display for EdgeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}->{}", self.from, self.field, self.to)
    }
}

impl FromStr for EdgeLabel {
    type Err = EdgeLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeLabel::parse(s)
    }
}
