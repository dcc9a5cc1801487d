use crate::db::PlanId;
use sea_orm::entity::prelude::*;

/// A plan tier.
///
/// The limit columns predate `plan_entitlements` and are only consulted when a plan has no
/// scoped entitlement rows. `round_types` and `extras` hold a JSON list or the `*` wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: PlanId,
    pub code: String,
    pub name: String,
    pub max_players: Option<i32>,
    pub max_rounds: Option<i32>,
    pub concurrent_rooms: Option<i32>,
    pub round_types: Option<String>,
    pub extras: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::plan_entitlement::Entity")]
    PlanEntitlement,
    #[sea_orm(has_many = "super::club_plan::Entity")]
    ClubPlan,
}

impl Related<super::plan_entitlement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlanEntitlement.def()
    }
}

impl Related<super::club_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClubPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
