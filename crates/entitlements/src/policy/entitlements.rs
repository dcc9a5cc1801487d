use super::StoredJson;
use crate::db::PlanId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fs, path::Path};

/// The list entry that lifts every restriction from an allow list.
pub const WILDCARD: &str = "*";

/// A set of round types or extras a plan permits.
///
/// Serialized as a JSON list, with the wildcard written as `["*"]`. A bare `"*"` string is also
/// accepted when deserializing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowList {
    Any,
    Only(Vec<String>),
}

impl AllowList {
    pub fn only<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from(items.into_iter().map(Into::into).collect::<Vec<_>>())
    }

    pub fn permits(&self, item: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(items) => items.iter().any(|allowed| allowed == item),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True for an explicit list with nothing in it. The wildcard is never empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(items) if items.is_empty())
    }

    /// Decodes a legacy plan column, which holds either a JSON list or a bare `*`.
    pub fn decode_column(column: &str, raw: Option<&str>) -> StoredJson<Self> {
        match raw.map(str::trim) {
            Some(WILDCARD) => StoredJson::Parsed(Self::Any),
            raw => StoredJson::decode(column, raw),
        }
    }
}

impl From<Vec<String>> for AllowList {
    fn from(items: Vec<String>) -> Self {
        if items.iter().any(|item| item == WILDCARD) {
            Self::Any
        } else {
            Self::Only(items)
        }
    }
}

impl std::fmt::Display for AllowList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Only(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl Serialize for AllowList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => [WILDCARD].serialize(serializer),
            Self::Only(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AllowList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(item) => Self::from(vec![item]),
            Raw::Many(items) => Self::from(items),
        })
    }
}

/// The conservative limits used whenever a club's real entitlements can't be determined, and
/// field by field whenever a stored limit is missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementDefaults {
    pub max_players_per_game: i32,
    pub max_rounds: i32,
    pub round_types_allowed: AllowList,
    pub extras_allowed: AllowList,
    pub concurrent_rooms: i32,
    pub game_credits_remaining: i32,
}

impl Default for EntitlementDefaults {
    fn default() -> Self {
        Self {
            max_players_per_game: 20,
            max_rounds: 8,
            round_types_allowed: AllowList::only(["general_trivia", "wipeout"]),
            extras_allowed: AllowList::only(["buyHints", "restorePoints"]),
            concurrent_rooms: 1,
            game_credits_remaining: 3,
        }
    }
}

impl EntitlementDefaults {
    /// Reads defaults from a TOML file. Keys left out of the file keep their built-in values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// The effective limits for a club at the moment they were resolved.
///
/// Field names match the legacy plan shape the rest of the product reads. Override keys that
/// don't correspond to a field are carried in `extensions` and serialized inline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    pub max_players_per_game: i32,
    pub max_rounds: i32,
    pub round_types_allowed: AllowList,
    pub extras_allowed: AllowList,
    pub concurrent_rooms: i32,
    pub game_credits_remaining: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_code: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Entitlements {
    pub fn fallback(defaults: &EntitlementDefaults) -> Self {
        Self {
            max_players_per_game: defaults.max_players_per_game,
            max_rounds: defaults.max_rounds,
            round_types_allowed: defaults.round_types_allowed.clone(),
            extras_allowed: defaults.extras_allowed.clone(),
            concurrent_rooms: defaults.concurrent_rooms,
            game_credits_remaining: defaults.game_credits_remaining,
            plan_id: None,
            plan_code: None,
            features: BTreeMap::new(),
            extensions: Map::new(),
        }
    }

    /// Applies a club's overrides. Every recognized key replaces its field; unrecognized keys
    /// are kept in `extensions`. Values are not checked for plausibility.
    ///
    /// Numeric strings and whole floats are accepted for limits, and a bare `*` or a
    /// comma-separated string for allow lists. A value that still doesn't fit its field is kept
    /// in `extensions` under its own key, so it survives into the serialized record.
    ///
    /// The credit balance and plan identity can't be overridden since they're attached after
    /// overrides are applied.
    pub fn apply_overrides(&mut self, overrides: Map<String, Value>) {
        for (key, value) in overrides {
            let unapplied = match key.as_str() {
                "max_players_per_game" | "maxPlayers" => {
                    override_with(&key, value, &mut self.max_players_per_game, coerce_limit)
                }
                "max_rounds" | "maxRounds" => {
                    override_with(&key, value, &mut self.max_rounds, coerce_limit)
                }
                "round_types_allowed" | "roundTypes" => {
                    override_with(&key, value, &mut self.round_types_allowed, coerce_allow_list)
                }
                "extras_allowed" | "extras" => {
                    override_with(&key, value, &mut self.extras_allowed, coerce_allow_list)
                }
                "concurrent_rooms" | "concurrentRooms" => {
                    override_with(&key, value, &mut self.concurrent_rooms, coerce_limit)
                }
                "features" => override_with(&key, value, &mut self.features, |value| {
                    serde_json::from_value(value.clone()).ok()
                }),
                "game_credits_remaining" | "plan_id" | "plan_code" => {
                    log::warn!("ignoring override for {key}, which can't be overridden");
                    None
                }
                _ => Some(value),
            };

            if let Some(value) = unapplied {
                self.extensions.insert(key, value);
            }
        }
    }
}

/// Writes the coerced value into `field`, or hands the raw value back when it can't be coerced.
fn override_with<T>(
    key: &str,
    value: Value,
    field: &mut T,
    coerce: impl Fn(&Value) -> Option<T>,
) -> Option<Value> {
    match coerce(&value) {
        Some(coerced) => {
            *field = coerced;
            None
        }
        None => {
            log::warn!("override {key} doesn't fit its field; keeping {value} as given");
            Some(value)
        }
    }
}

fn coerce_limit(value: &Value) -> Option<i32> {
    let number = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(whole_number)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
        }
        _ => None,
    }?;
    i32::try_from(number).ok()
}

fn whole_number(number: f64) -> Option<i64> {
    (number.is_finite() && number.fract() == 0.0).then_some(number as i64)
}

fn coerce_allow_list(value: &Value) -> Option<AllowList> {
    match value {
        Value::String(text) => Some(AllowList::from(
            text.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>(),
        )),
        _ => serde_json::from_value(value.clone()).ok(),
    }
}
