// Copyright 2025 Cowboy AI, LLC.

//! External-key codec
//!
//! Every entity carries an external id + scope pair; its external key is the
//! composed string `extId[:]scope`. Rankings, staff affiliations and key
//! moments have compound keys built from fixed separator sequences. The
//! separator bytes are printable ASCII bracket sequences that must not appear
//! inside ids or scopes; parsing is strict and refuses to guess on malformed
//! input.

use crate::resource_type::ResourceType;
use crate::storage::{Document, Filter};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Boundary between an external id and its scope.
pub const KEY_SEP: &str = "[:]";
/// Ranking label separator (precedes the date-time label).
pub const RANKING_LABEL_SEP: &str = "[@]";
/// Ranking position separator (precedes the rank).
pub const RANKING_POS_SEP: &str = "[#]";

/// Every separator sequence, for component validation.
const ALL_SEPARATORS: &[&str] = &[
    KEY_SEP,
    RANKING_LABEL_SEP,
    RANKING_POS_SEP,
    "[st]",
    "[sp]",
    "[et]",
    "[ep]",
    "[t]",
    "[c]",
    "[n]",
];

/// Errors produced by key composition or parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A simple external key did not split into id and scope
    #[error("bad external key {key:?}: {reason}")]
    BadExternalKey {
        /// The offending key string
        key: String,
        /// What was structurally wrong
        reason: String,
    },

    /// A compound key failed its variant grammar
    #[error("bad {kind} compound key {key:?}")]
    BadCompoundKey {
        /// Compound kind (`ranking`, `staff`, `keyMoment`)
        kind: &'static str,
        /// The offending key string
        key: String,
    },

    /// An id or scope contained a separator sequence
    #[error("separator sequence inside identity component {component:?}")]
    SeparatorInComponent {
        /// The offending component
        component: String,
    },

    /// A document lacked a field the codec needs to compose its key
    #[error("{resource_type} document is missing identity field {field}")]
    MissingIdentityField {
        /// Type of the document
        resource_type: ResourceType,
        /// Field that was absent or of the wrong shape
        field: &'static str,
    },
}

/// A simple external identity: id + scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalKey {
    /// External id
    pub id: String,
    /// External id scope (issuing authority)
    pub scope: String,
}

impl ExternalKey {
    /// Create a key after validating that neither component carries a
    /// separator sequence.
    pub fn new(id: impl Into<String>, scope: impl Into<String>) -> Result<Self, KeyError> {
        let id = id.into();
        let scope = scope.into();
        for component in [&id, &scope] {
            if component.is_empty() {
                return Err(KeyError::BadExternalKey {
                    key: format!("{id}{KEY_SEP}{scope}"),
                    reason: "empty id or scope".to_string(),
                });
            }
            if ALL_SEPARATORS.iter().any(|sep| component.contains(sep)) {
                return Err(KeyError::SeparatorInComponent {
                    component: component.clone(),
                });
            }
        }
        Ok(Self { id, scope })
    }

    /// Compose the canonical `id[:]scope` string.
    pub fn compose(&self) -> String {
        format!("{}{KEY_SEP}{}", self.id, self.scope)
    }

    /// Parse a canonical `id[:]scope` string.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let mut parts = input.split(KEY_SEP);
        let (id, scope) = match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(scope), None) => (id, scope),
            _ => {
                return Err(KeyError::BadExternalKey {
                    key: input.to_string(),
                    reason: format!("expected exactly one {KEY_SEP} separator"),
                })
            }
        };
        Self::new(id, scope)
    }
}

impl Display for ExternalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// The four ranking variants, encoded by the middle separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingVariant {
    /// Stage ranking of a team (`[st]`)
    StageTeam,
    /// Stage ranking of a sports person (`[sp]`)
    StageSportsPerson,
    /// Event ranking of a team (`[et]`)
    EventTeam,
    /// Event ranking of a sports person (`[ep]`)
    EventSportsPerson,
}

impl RankingVariant {
    /// The separator sequence encoding this variant.
    pub fn separator(&self) -> &'static str {
        match self {
            RankingVariant::StageTeam => "[st]",
            RankingVariant::StageSportsPerson => "[sp]",
            RankingVariant::EventTeam => "[et]",
            RankingVariant::EventSportsPerson => "[ep]",
        }
    }

    /// Document field carrying the subject (stage or event) key.
    pub fn subject_field(&self) -> &'static str {
        match self {
            RankingVariant::StageTeam | RankingVariant::StageSportsPerson => "externalStageKey",
            RankingVariant::EventTeam | RankingVariant::EventSportsPerson => "externalEventKey",
        }
    }

    /// Document field carrying the participant (team or sports person) key.
    pub fn participant_field(&self) -> &'static str {
        match self {
            RankingVariant::StageTeam | RankingVariant::EventTeam => "externalTeamKey",
            RankingVariant::StageSportsPerson | RankingVariant::EventSportsPerson => {
                "externalSportsPersonKey"
            }
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "st" => Some(RankingVariant::StageTeam),
            "sp" => Some(RankingVariant::StageSportsPerson),
            "et" => Some(RankingVariant::EventTeam),
            "ep" => Some(RankingVariant::EventSportsPerson),
            _ => None,
        }
    }
}

/// Compound external identity of a ranking entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankingKey {
    /// Which of the four variants this key encodes
    pub variant: RankingVariant,
    /// Stage or event identity
    pub subject: ExternalKey,
    /// Team or sports-person identity
    pub participant: ExternalKey,
    /// Date-time label of the ranking snapshot
    pub date_time_label: String,
    /// Rank position
    pub rank: i64,
}

lazy_static! {
    static ref RANKING_KEY_RE: Regex =
        Regex::new(r"^(?P<subject>.+?)\[(?P<variant>st|sp|et|ep)\](?P<participant>.+?)\[@\](?P<label>.+?)\[#\](?P<rank>\d+)$")
            .expect("ranking key grammar");
    static ref STAFF_KEY_RE: Regex =
        Regex::new(r"^(?P<sp>.+?)\[(?P<affiliation>t|c|n)\](?P<other>.+)$")
            .expect("staff key grammar");
}

impl RankingKey {
    /// Compose the canonical compound string.
    pub fn compose(&self) -> String {
        format!(
            "{}{}{}{RANKING_LABEL_SEP}{}{RANKING_POS_SEP}{}",
            self.subject.compose(),
            self.variant.separator(),
            self.participant.compose(),
            self.date_time_label,
            self.rank
        )
    }

    /// Parse a canonical compound string; strict, order-sensitive.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let caps = RANKING_KEY_RE
            .captures(input)
            .ok_or(KeyError::BadCompoundKey {
                kind: "ranking",
                key: input.to_string(),
            })?;
        let variant = RankingVariant::from_token(&caps["variant"]).ok_or(
            KeyError::BadCompoundKey {
                kind: "ranking",
                key: input.to_string(),
            },
        )?;
        let rank = caps["rank"]
            .parse::<i64>()
            .map_err(|_| KeyError::BadCompoundKey {
                kind: "ranking",
                key: input.to_string(),
            })?;
        Ok(Self {
            variant,
            subject: ExternalKey::parse(&caps["subject"])?,
            participant: ExternalKey::parse(&caps["participant"])?,
            date_time_label: caps["label"].to_string(),
            rank,
        })
    }
}

impl Display for RankingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// Which entity a staff member is affiliated with; exactly one of team,
/// club or nation is populated per staff document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffAffiliation {
    /// Affiliated with a team (`[t]`)
    Team,
    /// Affiliated with a club (`[c]`)
    Club,
    /// Affiliated with a nation (`[n]`)
    Nation,
}

impl StaffAffiliation {
    /// The separator sequence encoding this affiliation.
    pub fn separator(&self) -> &'static str {
        match self {
            StaffAffiliation::Team => "[t]",
            StaffAffiliation::Club => "[c]",
            StaffAffiliation::Nation => "[n]",
        }
    }

    /// Document field carrying the affiliated entity's key.
    pub fn field(&self) -> &'static str {
        match self {
            StaffAffiliation::Team => "externalTeamKey",
            StaffAffiliation::Club => "externalClubKey",
            StaffAffiliation::Nation => "externalNationKey",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "t" => Some(StaffAffiliation::Team),
            "c" => Some(StaffAffiliation::Club),
            "n" => Some(StaffAffiliation::Nation),
            _ => None,
        }
    }
}

/// Compound external identity of a staff affiliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffKey {
    /// The sports person
    pub sports_person: ExternalKey,
    /// Affiliation kind, encoded in the separator
    pub affiliation: StaffAffiliation,
    /// The affiliated team, club or nation
    pub other: ExternalKey,
}

impl StaffKey {
    /// Compose the canonical compound string.
    pub fn compose(&self) -> String {
        format!(
            "{}{}{}",
            self.sports_person.compose(),
            self.affiliation.separator(),
            self.other.compose()
        )
    }

    /// Parse a canonical compound string.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let caps = STAFF_KEY_RE
            .captures(input)
            .ok_or(KeyError::BadCompoundKey {
                kind: "staff",
                key: input.to_string(),
            })?;
        let affiliation =
            StaffAffiliation::from_token(&caps["affiliation"]).ok_or(KeyError::BadCompoundKey {
                kind: "staff",
                key: input.to_string(),
            })?;
        Ok(Self {
            sports_person: ExternalKey::parse(&caps["sp"])?,
            affiliation,
            other: ExternalKey::parse(&caps["other"])?,
        })
    }
}

impl Display for StaffKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// Compound external identity of a key moment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyMomentKey {
    /// ISO date-time of the moment
    pub date_time: String,
    /// Event the moment belongs to
    pub event: ExternalKey,
    /// Moment type
    pub kind: String,
    /// Moment sub-type
    pub sub_kind: String,
}

impl KeyMomentKey {
    /// Compose the canonical `dateTime[:]eventId[:]scope[:]type[:]subType`
    /// string.
    pub fn compose(&self) -> String {
        format!(
            "{}{KEY_SEP}{}{KEY_SEP}{}{KEY_SEP}{}",
            self.date_time,
            self.event.compose(),
            self.kind,
            self.sub_kind
        )
    }

    /// Parse a canonical compound string: exactly five `[:]`-separated,
    /// non-empty segments.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = input.split(KEY_SEP).collect();
        if parts.len() != 5 || parts.iter().any(|p| p.is_empty()) {
            return Err(KeyError::BadCompoundKey {
                kind: "keyMoment",
                key: input.to_string(),
            });
        }
        Ok(Self {
            date_time: parts[0].to_string(),
            event: ExternalKey::new(parts[1], parts[2])?,
            kind: parts[3].to_string(),
            sub_kind: parts[4].to_string(),
        })
    }
}

impl Display for KeyMomentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// A type-appropriate parsed identity, produced from a raw external-key
/// string and the entity type it identifies.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedKey {
    /// Simple id + scope identity
    Simple(ExternalKey),
    /// Ranking compound identity
    Ranking(RankingKey),
    /// Staff compound identity
    Staff(StaffKey),
    /// Key-moment compound identity
    KeyMoment(KeyMomentKey),
}

impl ParsedKey {
    /// Parse `key` according to the identity grammar of `resource_type`.
    pub fn parse_for(resource_type: ResourceType, key: &str) -> Result<Self, KeyError> {
        match resource_type {
            ResourceType::Ranking => RankingKey::parse(key).map(ParsedKey::Ranking),
            ResourceType::Staff => StaffKey::parse(key).map(ParsedKey::Staff),
            ResourceType::KeyMoment => KeyMomentKey::parse(key).map(ParsedKey::KeyMoment),
            _ => ExternalKey::parse(key).map(ParsedKey::Simple),
        }
    }

    /// Recompose the canonical key string.
    pub fn compose(&self) -> String {
        match self {
            ParsedKey::Simple(key) => key.compose(),
            ParsedKey::Ranking(key) => key.compose(),
            ParsedKey::Staff(key) => key.compose(),
            ParsedKey::KeyMoment(key) => key.compose(),
        }
    }

    /// The identity fields this key pins on a home document, as
    /// `(field, value)` pairs. Used both to locate the source document and
    /// to seed upserted stub records.
    pub fn identity_pairs(&self) -> Vec<(&'static str, Value)> {
        match self {
            ParsedKey::Simple(key) => vec![
                ("_externalId", Value::String(key.id.clone())),
                ("_externalIdScope", Value::String(key.scope.clone())),
            ],
            ParsedKey::Ranking(key) => vec![
                (
                    key.variant.subject_field(),
                    Value::String(key.subject.compose()),
                ),
                (
                    key.variant.participant_field(),
                    Value::String(key.participant.compose()),
                ),
                ("dateTimeLabel", Value::String(key.date_time_label.clone())),
                ("rank", Value::from(key.rank)),
            ],
            ParsedKey::Staff(key) => vec![
                (
                    "externalSportsPersonKey",
                    Value::String(key.sports_person.compose()),
                ),
                (key.affiliation.field(), Value::String(key.other.compose())),
            ],
            ParsedKey::KeyMoment(key) => vec![
                ("dateTime", Value::String(key.date_time.clone())),
                ("externalEventKey", Value::String(key.event.compose())),
                ("type", Value::String(key.kind.clone())),
                ("subType", Value::String(key.sub_kind.clone())),
            ],
        }
    }

    /// Filter locating the home document this key identifies.
    pub fn identity_filter(&self) -> Filter {
        Filter::And(
            self.identity_pairs()
                .into_iter()
                .map(|(field, value)| Filter::Eq(field.to_string(), value))
                .collect(),
        )
    }
}

fn doc_str<'a>(doc: &'a Document, field: &'static str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Compose the external key of a home document of the given type. Returns
/// `MissingIdentityField` when the document lacks a component; composition
/// never guesses between conflicting variants.
pub fn external_key_of(resource_type: ResourceType, doc: &Document) -> Result<String, KeyError> {
    match resource_type {
        ResourceType::Ranking => {
            let (variant, subject) = match (
                doc_str(doc, "externalStageKey"),
                doc_str(doc, "externalEventKey"),
            ) {
                (Some(stage), None) => (true, stage),
                (None, Some(event)) => (false, event),
                _ => {
                    return Err(KeyError::MissingIdentityField {
                        resource_type,
                        field: "externalStageKey|externalEventKey",
                    })
                }
            };
            let (team_dim, participant) = match (
                doc_str(doc, "externalTeamKey"),
                doc_str(doc, "externalSportsPersonKey"),
            ) {
                (Some(team), None) => (true, team),
                (None, Some(person)) => (false, person),
                _ => {
                    return Err(KeyError::MissingIdentityField {
                        resource_type,
                        field: "externalTeamKey|externalSportsPersonKey",
                    })
                }
            };
            let variant = match (variant, team_dim) {
                (true, true) => RankingVariant::StageTeam,
                (true, false) => RankingVariant::StageSportsPerson,
                (false, true) => RankingVariant::EventTeam,
                (false, false) => RankingVariant::EventSportsPerson,
            };
            let label = doc_str(doc, "dateTimeLabel").ok_or(KeyError::MissingIdentityField {
                resource_type,
                field: "dateTimeLabel",
            })?;
            let rank = doc
                .get("rank")
                .and_then(Value::as_i64)
                .ok_or(KeyError::MissingIdentityField {
                    resource_type,
                    field: "rank",
                })?;
            Ok(RankingKey {
                variant,
                subject: ExternalKey::parse(subject)?,
                participant: ExternalKey::parse(participant)?,
                date_time_label: label.to_string(),
                rank,
            }
            .compose())
        }
        ResourceType::Staff => {
            let sports_person =
                doc_str(doc, "externalSportsPersonKey").ok_or(KeyError::MissingIdentityField {
                    resource_type,
                    field: "externalSportsPersonKey",
                })?;
            let candidates = [
                (StaffAffiliation::Team, doc_str(doc, "externalTeamKey")),
                (StaffAffiliation::Club, doc_str(doc, "externalClubKey")),
                (StaffAffiliation::Nation, doc_str(doc, "externalNationKey")),
            ];
            let mut present = candidates
                .into_iter()
                .filter_map(|(aff, key)| key.map(|k| (aff, k)));
            let (affiliation, other) = match (present.next(), present.next()) {
                (Some(found), None) => found,
                _ => {
                    return Err(KeyError::MissingIdentityField {
                        resource_type,
                        field: "externalTeamKey|externalClubKey|externalNationKey",
                    })
                }
            };
            Ok(StaffKey {
                sports_person: ExternalKey::parse(sports_person)?,
                affiliation,
                other: ExternalKey::parse(other)?,
            }
            .compose())
        }
        ResourceType::KeyMoment => {
            let date_time = doc_str(doc, "dateTime").ok_or(KeyError::MissingIdentityField {
                resource_type,
                field: "dateTime",
            })?;
            let event =
                doc_str(doc, "externalEventKey").ok_or(KeyError::MissingIdentityField {
                    resource_type,
                    field: "externalEventKey",
                })?;
            let kind = doc_str(doc, "type").ok_or(KeyError::MissingIdentityField {
                resource_type,
                field: "type",
            })?;
            let sub_kind = doc_str(doc, "subType").ok_or(KeyError::MissingIdentityField {
                resource_type,
                field: "subType",
            })?;
            Ok(KeyMomentKey {
                date_time: date_time.to_string(),
                event: ExternalKey::parse(event)?,
                kind: kind.to_string(),
                sub_kind: sub_kind.to_string(),
            }
            .compose())
        }
        _ => {
            let id = doc_str(doc, "_externalId").ok_or(KeyError::MissingIdentityField {
                resource_type,
                field: "_externalId",
            })?;
            let scope =
                doc_str(doc, "_externalIdScope").ok_or(KeyError::MissingIdentityField {
                    resource_type,
                    field: "_externalIdScope",
                })?;
            Ok(ExternalKey::new(id, scope)?.compose())
        }
    }
}

/// Deterministic non-cryptographic short hash, used to name intermediate
/// traversal outputs. Stable across runs and platforms.
pub fn short_hash(input: &str) -> String {
    format!("{:08x}", (xxh3_64(input.as_bytes()) & 0xffff_ffff) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn external_key_round_trips() {
        let key = ExternalKey::new("289175", "fifa").unwrap();
        assert_eq!(key.compose(), "289175[:]fifa");
        assert_eq!(ExternalKey::parse("289175[:]fifa").unwrap(), key);
    }

    #[test]
    fn external_key_rejects_wrong_arity_and_separators() {
        assert!(matches!(
            ExternalKey::parse("loneid"),
            Err(KeyError::BadExternalKey { .. })
        ));
        assert!(matches!(
            ExternalKey::parse("a[:]b[:]c"),
            Err(KeyError::BadExternalKey { .. })
        ));
        assert!(matches!(
            ExternalKey::new("a[#]b", "fifa"),
            Err(KeyError::SeparatorInComponent { .. })
        ));
        assert!(matches!(
            ExternalKey::new("", "fifa"),
            Err(KeyError::BadExternalKey { .. })
        ));
    }

    #[test]
    fn ranking_key_round_trips_all_variants() {
        for variant in [
            RankingVariant::StageTeam,
            RankingVariant::StageSportsPerson,
            RankingVariant::EventTeam,
            RankingVariant::EventSportsPerson,
        ] {
            let key = RankingKey {
                variant,
                subject: ExternalKey::new("s9", "fifa").unwrap(),
                participant: ExternalKey::new("p4", "fifa").unwrap(),
                date_time_label: "2024-06-01".to_string(),
                rank: 3,
            };
            let composed = key.compose();
            assert_eq!(RankingKey::parse(&composed).unwrap(), key);
        }
    }

    #[test]
    fn ranking_key_parse_is_strict() {
        // unknown variant token
        assert!(matches!(
            RankingKey::parse("s9[:]fifa[xx]p4[:]fifa[@]d[#]3"),
            Err(KeyError::BadCompoundKey { kind: "ranking", .. })
        ));
        // missing rank separator
        assert!(matches!(
            RankingKey::parse("s9[:]fifa[st]p4[:]fifa[@]d3"),
            Err(KeyError::BadCompoundKey { kind: "ranking", .. })
        ));
        // non-numeric rank
        assert!(matches!(
            RankingKey::parse("s9[:]fifa[st]p4[:]fifa[@]d[#]first"),
            Err(KeyError::BadCompoundKey { kind: "ranking", .. })
        ));
    }

    #[test]
    fn staff_key_round_trips_each_affiliation() {
        for affiliation in [
            StaffAffiliation::Team,
            StaffAffiliation::Club,
            StaffAffiliation::Nation,
        ] {
            let key = StaffKey {
                sports_person: ExternalKey::new("p7", "uefa").unwrap(),
                affiliation,
                other: ExternalKey::new("x1", "uefa").unwrap(),
            };
            assert_eq!(StaffKey::parse(&key.compose()).unwrap(), key);
        }
        assert!(StaffKey::parse("p7[:]uefa").is_err());
    }

    #[test]
    fn key_moment_key_round_trips() {
        let key = KeyMomentKey {
            date_time: "2024-05-01T12:00:00.000Z".to_string(),
            event: ExternalKey::new("e1", "fifa").unwrap(),
            kind: "goal".to_string(),
            sub_kind: "penalty".to_string(),
        };
        let composed = key.compose();
        assert_eq!(
            composed,
            "2024-05-01T12:00:00.000Z[:]e1[:]fifa[:]goal[:]penalty"
        );
        assert_eq!(KeyMomentKey::parse(&composed).unwrap(), key);
        assert!(KeyMomentKey::parse("2024[:]e1[:]fifa[:]goal").is_err());
    }

    #[test]
    fn parse_for_dispatches_by_type() {
        assert!(matches!(
            ParsedKey::parse_for(ResourceType::Team, "t1[:]uefa").unwrap(),
            ParsedKey::Simple(_)
        ));
        assert!(matches!(
            ParsedKey::parse_for(ResourceType::Ranking, "s9[:]fifa[st]t1[:]fifa[@]d[#]1").unwrap(),
            ParsedKey::Ranking(_)
        ));
        // a simple key is not a valid ranking key
        assert!(ParsedKey::parse_for(ResourceType::Ranking, "t1[:]uefa").is_err());
    }

    #[test]
    fn identity_filter_pins_every_component() {
        let parsed =
            ParsedKey::parse_for(ResourceType::Staff, "p7[:]uefa[c]c2[:]uefa").unwrap();
        let Filter::And(clauses) = parsed.identity_filter() else {
            panic!("expected conjunction");
        };
        assert_eq!(clauses.len(), 2);
        assert!(clauses.contains(&Filter::eq("externalSportsPersonKey", "p7[:]uefa")));
        assert!(clauses.contains(&Filter::eq("externalClubKey", "c2[:]uefa")));
    }

    #[test]
    fn external_key_of_reads_documents() {
        let doc = json!({"_externalId": "t1", "_externalIdScope": "uefa"});
        assert_eq!(
            external_key_of(ResourceType::Team, &doc).unwrap(),
            "t1[:]uefa"
        );

        let ranking = json!({
            "externalEventKey": "e1[:]fifa",
            "externalSportsPersonKey": "p4[:]fifa",
            "dateTimeLabel": "2024-06-01",
            "rank": 2
        });
        assert_eq!(
            external_key_of(ResourceType::Ranking, &ranking).unwrap(),
            "e1[:]fifa[ep]p4[:]fifa[@]2024-06-01[#]2"
        );

        // a ranking with both subject fields populated is refused
        let ambiguous = json!({
            "externalStageKey": "s1[:]fifa",
            "externalEventKey": "e1[:]fifa",
            "externalTeamKey": "t1[:]fifa",
            "dateTimeLabel": "d",
            "rank": 1
        });
        assert!(external_key_of(ResourceType::Ranking, &ambiguous).is_err());
    }

    #[test]
    fn short_hash_is_stable() {
        let a = short_hash("competition.stages->stage");
        let b = short_hash("competition.stages->stage");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, short_hash("competition.sgos->sgo"));
    }
}
