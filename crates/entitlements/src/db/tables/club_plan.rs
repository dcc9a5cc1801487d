use crate::db::PlanId;
use sea_orm::entity::prelude::*;

/// The plan currently assigned to a club, together with its credit balance.
///
/// `game_credits_remaining` is only ever written through the guarded updates in
/// `Database::consume_club_credit` and `Database::grant_club_credits`.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "club_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub club_id: String,
    pub plan_id: PlanId,
    pub game_credits_remaining: Option<i32>,
    /// JSON object whose keys replace resolved entitlement fields.
    pub overrides: Option<String>,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::club::Entity",
        from = "Column::ClubId",
        to = "super::club::Column::Id"
    )]
    Club,
    #[sea_orm(
        belongs_to = "super::plan::Entity",
        from = "Column::PlanId",
        to = "super::plan::Column::Id"
    )]
    Plan,
}

impl Related<super::club::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Club.def()
    }
}

impl Related<super::plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
