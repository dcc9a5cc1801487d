use super::*;

pub mod club_plans;
pub mod clubs;
pub mod plan_entitlements;
pub mod plans;
