use crate::db::{PlanEntitlementId, PlanId};
use sea_orm::entity::prelude::*;

/// A `(scope, key, value)` entitlement row attached to a plan. `value` is JSON text.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "plan_entitlements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: PlanEntitlementId,
    pub plan_id: PlanId,
    pub scope: String,
    pub key: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
