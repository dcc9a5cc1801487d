use super::{
    check_caps, AllowList, CapsDecision, CapsPolicy, EntitlementDefaults, Entitlements,
    RoomConfig, StoredJson,
};
use crate::db::{club_plan, plan, plan_entitlement, Database};
use crate::Result;
use serde::Deserialize;
use std::{collections::BTreeMap, sync::Arc};

/// Resolves entitlements, checks room configurations, and moves credits for clubs.
///
/// None of the public methods fail. When the store is missing or misbehaves they log a warning
/// and answer with the fallback entitlements, or `false` for credit operations.
pub struct EntitlementService {
    pub(super) db: Option<Arc<Database>>,
    defaults: EntitlementDefaults,
    caps_policy: CapsPolicy,
}

impl EntitlementService {
    pub fn new(
        db: Option<Arc<Database>>,
        defaults: EntitlementDefaults,
        caps_policy: CapsPolicy,
    ) -> Self {
        Self {
            db,
            defaults,
            caps_policy,
        }
    }

    pub fn caps_policy(&self) -> &CapsPolicy {
        &self.caps_policy
    }

    pub fn fallback(&self) -> Entitlements {
        Entitlements::fallback(&self.defaults)
    }

    /// Returns the entitlements currently in effect for the given club.
    pub async fn resolve(&self, club_id: Option<&str>) -> Entitlements {
        let Some(club_id) = club_id.filter(|club_id| !club_id.is_empty()) else {
            log::warn!("no club id given; using fallback entitlements");
            return self.fallback();
        };
        let Some(db) = self.db.as_ref() else {
            log::warn!("no database connection; using fallback entitlements for club {club_id}");
            return self.fallback();
        };

        match self.resolve_from_db(db, club_id).await {
            Ok(Some(entitlements)) => entitlements,
            Ok(None) => self.fallback(),
            Err(error) => {
                log::warn!("failed to resolve entitlements for club {club_id}: {error:?}");
                self.fallback()
            }
        }
    }

    /// Resolves the club's entitlements and checks `room` against them.
    pub async fn check_room(&self, club_id: Option<&str>, room: &RoomConfig) -> CapsDecision {
        let entitlements = self.resolve(club_id).await;
        self.check_caps(&entitlements, room)
    }

    pub fn check_caps(&self, entitlements: &Entitlements, room: &RoomConfig) -> CapsDecision {
        check_caps(entitlements, room, &self.caps_policy)
    }

    async fn resolve_from_db(&self, db: &Database, club_id: &str) -> Result<Option<Entitlements>> {
        if db.get_club(club_id).await?.is_none() {
            log::warn!("club {club_id} not found; using fallback entitlements");
            return Ok(None);
        }

        let Some((club_plan, plan)) = db.get_club_plan_with_plan(club_id).await? else {
            log::warn!("club {club_id} has no plan; using fallback entitlements");
            return Ok(None);
        };
        let Some(plan) = plan else {
            log::warn!(
                "club {club_id} is assigned missing plan {}; using fallback entitlements",
                club_plan.plan_id
            );
            return Ok(None);
        };

        let rows = db.get_plan_entitlements(plan.id).await?;
        let mut entitlements = if rows.is_empty() {
            log::info!(
                "plan {} has no scoped entitlements; reading plan columns",
                plan.code
            );
            self.from_plan_columns(&plan)
        } else {
            log::info!("plan {} has {} scoped entitlements", plan.code, rows.len());
            self.from_scoped_rows(&rows)
        };

        self.attach_club_plan(&mut entitlements, club_plan, &plan);
        Ok(Some(entitlements))
    }

    fn from_plan_columns(&self, plan: &plan::Model) -> Entitlements {
        let defaults = &self.defaults;
        Entitlements {
            max_players_per_game: plan.max_players.unwrap_or(defaults.max_players_per_game),
            max_rounds: plan.max_rounds.unwrap_or(defaults.max_rounds),
            round_types_allowed: non_empty(
                AllowList::decode_column("plans.round_types", plan.round_types.as_deref()),
                &defaults.round_types_allowed,
            ),
            extras_allowed: non_empty(
                AllowList::decode_column("plans.extras", plan.extras.as_deref()),
                &defaults.extras_allowed,
            ),
            concurrent_rooms: plan.concurrent_rooms.unwrap_or(defaults.concurrent_rooms),
            ..self.fallback()
        }
    }

    fn from_scoped_rows(&self, rows: &[plan_entitlement::Model]) -> Entitlements {
        let mut caps = QuizCaps::default();
        for row in rows {
            let Some(slot) = EntitlementSlot::for_row(&row.scope, &row.key) else {
                log::warn!(
                    "ignoring unknown entitlement {}.{} on plan {}",
                    row.scope,
                    row.key,
                    row.plan_id
                );
                continue;
            };
            let column = format!("plan_entitlements {slot} of plan {}", row.plan_id);
            let value = StoredJson::<serde_json::Value>::decode(&column, Some(row.value.as_str()));
            let Some(value) = value.parsed() else {
                continue;
            };
            caps.merge(slot.reduce(&column, value));
        }

        let defaults = &self.defaults;
        Entitlements {
            max_players_per_game: caps.max_players.unwrap_or(defaults.max_players_per_game),
            max_rounds: caps.max_rounds.unwrap_or(defaults.max_rounds),
            round_types_allowed: non_empty(
                caps.round_types.map_or(StoredJson::Fallback, StoredJson::Parsed),
                &defaults.round_types_allowed,
            ),
            extras_allowed: non_empty(
                caps.extras.map_or(StoredJson::Fallback, StoredJson::Parsed),
                &defaults.extras_allowed,
            ),
            concurrent_rooms: caps.concurrent_rooms.unwrap_or(defaults.concurrent_rooms),
            features: caps.features.unwrap_or_default(),
            ..self.fallback()
        }
    }

    fn attach_club_plan(
        &self,
        entitlements: &mut Entitlements,
        club_plan: club_plan::Model,
        plan: &plan::Model,
    ) {
        let overrides = StoredJson::<serde_json::Map<String, serde_json::Value>>::decode(
            "club_plans.overrides",
            club_plan.overrides.as_deref(),
        );
        if let Some(overrides) = overrides.parsed() {
            entitlements.apply_overrides(overrides);
        }

        entitlements.game_credits_remaining = club_plan.game_credits_remaining.unwrap_or(0);
        entitlements.plan_id = Some(plan.id);
        entitlements.plan_code = Some(plan.code.clone());
    }
}

/// Uses `fallback` unless `list` decoded to something non-empty.
fn non_empty(list: StoredJson<AllowList>, fallback: &AllowList) -> AllowList {
    match list {
        StoredJson::Parsed(list) if !list.is_empty() => list,
        _ => fallback.clone(),
    }
}

/// The `(scope, key)` pairs the resolver understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
enum EntitlementSlot {
    #[strum(serialize = "quiz.caps")]
    QuizCaps,
    #[strum(serialize = "quiz.round_types")]
    QuizRoundTypes,
    #[strum(serialize = "quiz.extras")]
    QuizExtras,
    #[strum(serialize = "quiz.features")]
    QuizFeatures,
}

impl EntitlementSlot {
    fn for_row(scope: &str, key: &str) -> Option<Self> {
        match (scope, key) {
            ("quiz", "caps") => Some(Self::QuizCaps),
            ("quiz", "round_types") => Some(Self::QuizRoundTypes),
            ("quiz", "extras") => Some(Self::QuizExtras),
            ("quiz", "features") => Some(Self::QuizFeatures),
            _ => None,
        }
    }

    /// Turns a row's value into the partial caps it contributes.
    fn reduce(self, column: &str, value: serde_json::Value) -> QuizCaps {
        match self {
            Self::QuizCaps => StoredJson::from_value(column, value)
                .parsed()
                .unwrap_or_default(),
            Self::QuizRoundTypes => QuizCaps {
                round_types: StoredJson::from_value(column, value).parsed(),
                ..Default::default()
            },
            Self::QuizExtras => QuizCaps {
                extras: StoredJson::from_value(column, value).parsed(),
                ..Default::default()
            },
            Self::QuizFeatures => QuizCaps {
                features: StoredJson::from_value(column, value).parsed(),
                ..Default::default()
            },
        }
    }
}

/// Limits gathered from a plan's `quiz` scope. Rows use camelCase names; the legacy snake_case
/// names are accepted too.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizCaps {
    #[serde(default, alias = "max_players_per_game")]
    max_players: Option<i32>,
    #[serde(default, alias = "max_rounds")]
    max_rounds: Option<i32>,
    #[serde(default, alias = "round_types_allowed")]
    round_types: Option<AllowList>,
    #[serde(default, alias = "extras_allowed")]
    extras: Option<AllowList>,
    #[serde(default, alias = "concurrent_rooms")]
    concurrent_rooms: Option<i32>,
    #[serde(default)]
    features: Option<BTreeMap<String, bool>>,
}

impl QuizCaps {
    /// Layers `other` on top of `self`; fields `other` sets win.
    fn merge(&mut self, other: QuizCaps) {
        self.max_players = other.max_players.or(self.max_players);
        self.max_rounds = other.max_rounds.or(self.max_rounds);
        self.round_types = other.round_types.or(self.round_types.take());
        self.extras = other.extras.or(self.extras.take());
        self.concurrent_rooms = other.concurrent_rooms.or(self.concurrent_rooms);
        if let Some(features) = other.features {
            self.features.get_or_insert_with(BTreeMap::new).extend(features);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_slot_for_row() {
        assert_eq!(
            EntitlementSlot::for_row("quiz", "caps"),
            Some(EntitlementSlot::QuizCaps)
        );
        assert_eq!(EntitlementSlot::QuizRoundTypes.to_string(), "quiz.round_types");
        assert_eq!(EntitlementSlot::for_row("bingo", "caps"), None);
        assert_eq!(EntitlementSlot::for_row("quiz", "prizes"), None);
    }

    #[test]
    fn test_reduce_and_merge() {
        let mut caps = QuizCaps::default();
        caps.merge(EntitlementSlot::QuizCaps.reduce(
            "quiz.caps",
            json!({ "maxPlayers": 50, "maxRounds": 10, "roundTypes": ["wipeout"] }),
        ));
        caps.merge(EntitlementSlot::QuizRoundTypes.reduce(
            "quiz.round_types",
            json!(["general_trivia", "speed_round"]),
        ));
        caps.merge(EntitlementSlot::QuizCaps.reduce("quiz.caps", json!({ "max_rounds": 12 })));
        caps.merge(EntitlementSlot::QuizExtras.reduce("quiz.extras", json!(42)));

        assert_eq!(
            caps,
            QuizCaps {
                max_players: Some(50),
                max_rounds: Some(12),
                round_types: Some(AllowList::only(["general_trivia", "speed_round"])),
                extras: None,
                concurrent_rooms: None,
                features: None,
            }
        );

        // A caps value of the wrong shape contributes nothing.
        let mut caps = QuizCaps::default();
        caps.merge(EntitlementSlot::QuizCaps.reduce("quiz.caps", json!([1, 2, 3])));
        assert_eq!(caps, QuizCaps::default());
    }
}
