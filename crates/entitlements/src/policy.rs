//! Plan entitlements for quiz rooms: resolving a club's limits, checking a room configuration
//! against them, and moving the club's credit balance.

mod caps;
mod entitlements;
mod ledger;
mod resolver;
mod stored_json;

pub use caps::{check_caps, CapsDecision, CapsPolicy, RoomConfig};
pub use entitlements::{AllowList, EntitlementDefaults, Entitlements, WILDCARD};
pub use resolver::EntitlementService;
pub use stored_json::StoredJson;
