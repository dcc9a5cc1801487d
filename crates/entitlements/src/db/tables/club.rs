use sea_orm::entity::prelude::*;

/// A club running quiz fundraisers. Clubs are provisioned elsewhere and only read here.
#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "clubs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::club_plan::Entity")]
    ClubPlan,
}

impl Related<super::club_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClubPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
