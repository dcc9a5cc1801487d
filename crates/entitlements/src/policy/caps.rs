use super::Entitlements;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Knobs for [`check_caps`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsPolicy {
    /// When false, enabled extras are never denied. Used while extras are in beta.
    pub enforce_extras: bool,
}

impl Default for CapsPolicy {
    fn default() -> Self {
        Self {
            enforce_extras: true,
        }
    }
}

/// The shape of a quiz room a host wants to open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub players: i32,
    pub rounds: i32,
    #[serde(default)]
    pub round_types: Vec<String>,
    #[serde(default)]
    pub extras: Option<BTreeMap<String, bool>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CapsDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Checks a room configuration against a club's entitlements.
///
/// Checks run cheapest first and stop at the first violation, so the reason always describes a
/// single problem.
pub fn check_caps(
    entitlements: &Entitlements,
    room: &RoomConfig,
    policy: &CapsPolicy,
) -> CapsDecision {
    if room.players > entitlements.max_players_per_game {
        return CapsDecision::deny(format!(
            "Max players is {} (requested {})",
            entitlements.max_players_per_game, room.players
        ));
    }

    if room.rounds > entitlements.max_rounds {
        return CapsDecision::deny(format!(
            "Max rounds is {} (requested {})",
            entitlements.max_rounds, room.rounds
        ));
    }

    let allowed_round_types = &entitlements.round_types_allowed;
    if !allowed_round_types.is_any() {
        let not_allowed = room
            .round_types
            .iter()
            .filter(|round_type| !allowed_round_types.permits(round_type))
            .map(String::as_str)
            .collect::<Vec<_>>();
        if !not_allowed.is_empty() {
            return CapsDecision::deny(format!(
                "Round types not allowed: {}. Allowed: {}",
                not_allowed.join(", "),
                allowed_round_types
            ));
        }
    }

    if policy.enforce_extras {
        if let Some(extras) = &room.extras {
            for (extra, _) in extras.iter().filter(|(_, enabled)| **enabled) {
                if !entitlements.extras_allowed.permits(extra) {
                    return CapsDecision::deny(format!("Extra not allowed on this plan: {extra}"));
                }
            }
        }
    }

    CapsDecision::allow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AllowList, EntitlementDefaults};
    use pretty_assertions::assert_eq;

    fn entitlements() -> Entitlements {
        Entitlements::fallback(&EntitlementDefaults::default())
    }

    fn room(players: i32, rounds: i32, round_types: &[&str]) -> RoomConfig {
        RoomConfig {
            players,
            rounds,
            round_types: round_types.iter().map(|s| s.to_string()).collect(),
            extras: None,
        }
    }

    #[test]
    fn test_too_many_players() {
        let decision = check_caps(
            &entitlements(),
            &room(25, 1, &["general_trivia"]),
            &CapsPolicy::default(),
        );
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("20"));

        // The player check wins over every later violation.
        let decision = check_caps(
            &entitlements(),
            &room(25, 99, &["speed_round"]),
            &CapsPolicy::default(),
        );
        assert_eq!(
            decision,
            CapsDecision::deny("Max players is 20 (requested 25)")
        );
    }

    #[test]
    fn test_at_limits() {
        assert_eq!(
            check_caps(
                &entitlements(),
                &room(20, 8, &["general_trivia", "wipeout"]),
                &CapsPolicy::default()
            ),
            CapsDecision::allow()
        );
    }

    #[test]
    fn test_too_many_rounds() {
        assert_eq!(
            check_caps(&entitlements(), &room(5, 9, &[]), &CapsPolicy::default()),
            CapsDecision::deny("Max rounds is 8 (requested 9)")
        );
    }

    #[test]
    fn test_round_types() {
        assert_eq!(
            check_caps(
                &entitlements(),
                &room(5, 2, &["general_trivia", "speed_round"]),
                &CapsPolicy::default()
            ),
            CapsDecision::deny(
                "Round types not allowed: speed_round. Allowed: general_trivia, wipeout"
            )
        );

        let mut entitlements = entitlements();
        entitlements.round_types_allowed = AllowList::Any;
        assert!(
            check_caps(
                &entitlements,
                &room(5, 2, &["speed_round", "media_puzzle", "anything"]),
                &CapsPolicy::default()
            )
            .allowed
        );
    }

    #[test]
    fn test_extras() {
        let mut request = room(5, 2, &["wipeout"]);
        request.extras = Some(BTreeMap::from_iter([
            ("buyHints".to_string(), true),
            ("robPoints".to_string(), true),
            ("freezeOutTeam".to_string(), false),
        ]));

        assert_eq!(
            check_caps(&entitlements(), &request, &CapsPolicy::default()),
            CapsDecision::deny("Extra not allowed on this plan: robPoints")
        );

        // Relaxed extras enforcement lets any extra through.
        assert_eq!(
            check_caps(
                &entitlements(),
                &request,
                &CapsPolicy {
                    enforce_extras: false
                }
            ),
            CapsDecision::allow()
        );

        let mut entitlements = entitlements();
        entitlements.extras_allowed = AllowList::Any;
        assert!(check_caps(&entitlements, &request, &CapsPolicy::default()).allowed);

        // Disabled extras are never checked.
        request.extras = Some(BTreeMap::from_iter([("robPoints".to_string(), false)]));
        assert!(check_caps(&entitlements, &request, &CapsPolicy::default()).allowed);
    }

    #[test]
    fn test_decision_json() {
        assert_eq!(
            serde_json::to_value(CapsDecision::allow()).unwrap(),
            serde_json::json!({ "allowed": true })
        );
        assert_eq!(
            serde_json::to_value(CapsDecision::deny("Max rounds is 8 (requested 9)")).unwrap(),
            serde_json::json!({ "allowed": false, "reason": "Max rounds is 8 (requested 9)" })
        );
    }
}
