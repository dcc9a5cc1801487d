pub mod club;
pub mod club_plan;
pub mod plan;
pub mod plan_entitlement;
