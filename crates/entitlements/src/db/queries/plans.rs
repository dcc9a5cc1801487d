use super::*;

#[derive(Debug, Default)]
pub struct NewPlanParams {
    pub code: String,
    pub name: String,
    pub max_players: Option<i32>,
    pub max_rounds: Option<i32>,
    pub concurrent_rooms: Option<i32>,
    pub round_types: Option<String>,
    pub extras: Option<String>,
}

impl Database {
    /// Creates a new plan.
    pub async fn create_plan(&self, params: &NewPlanParams) -> Result<plan::Model> {
        self.transaction(|tx| async move {
            let plan = plan::Entity::insert(plan::ActiveModel {
                code: ActiveValue::set(params.code.clone()),
                name: ActiveValue::set(params.name.clone()),
                max_players: ActiveValue::set(params.max_players),
                max_rounds: ActiveValue::set(params.max_rounds),
                concurrent_rooms: ActiveValue::set(params.concurrent_rooms),
                round_types: ActiveValue::set(params.round_types.clone()),
                extras: ActiveValue::set(params.extras.clone()),
                ..Default::default()
            })
            .exec_with_returning(&*tx)
            .await?;

            Ok(plan)
        })
        .await
    }

    /// Returns the plan with the given ID.
    pub async fn get_plan(&self, plan_id: PlanId) -> Result<Option<plan::Model>> {
        self.transaction(|tx| async move { Ok(plan::Entity::find_by_id(plan_id).one(&*tx).await?) })
            .await
    }

    /// Returns the plan with the given code, e.g. `FREE`.
    pub async fn get_plan_by_code(&self, code: &str) -> Result<Option<plan::Model>> {
        self.transaction(|tx| async move {
            Ok(plan::Entity::find()
                .filter(plan::Column::Code.eq(code))
                .one(&*tx)
                .await?)
        })
        .await
    }
}
