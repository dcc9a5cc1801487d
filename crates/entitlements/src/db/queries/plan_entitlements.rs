use super::*;
use sea_orm::QueryOrder;

impl Database {
    /// Stores `value` under `(scope, key)` for the given plan, replacing any previous value.
    pub async fn set_plan_entitlement(
        &self,
        plan_id: PlanId,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<plan_entitlement::Model> {
        let value = serde_json::to_string(value)?;
        self.transaction(|tx| {
            let value = value.clone();
            async move {
                let existing = plan_entitlement::Entity::find()
                    .filter(plan_entitlement::Column::PlanId.eq(plan_id))
                    .filter(plan_entitlement::Column::Scope.eq(scope))
                    .filter(plan_entitlement::Column::Key.eq(key))
                    .one(&*tx)
                    .await?;

                let row = if let Some(existing) = existing {
                    plan_entitlement::ActiveModel {
                        value: ActiveValue::set(value),
                        ..existing.into_active_model()
                    }
                    .update(&*tx)
                    .await?
                } else {
                    plan_entitlement::Entity::insert(plan_entitlement::ActiveModel {
                        plan_id: ActiveValue::set(plan_id),
                        scope: ActiveValue::set(scope.to_string()),
                        key: ActiveValue::set(key.to_string()),
                        value: ActiveValue::set(value),
                        ..Default::default()
                    })
                    .exec_with_returning(&*tx)
                    .await?
                };

                Ok(row)
            }
        })
        .await
    }

    /// Returns every entitlement row for the given plan, oldest first.
    pub async fn get_plan_entitlements(
        &self,
        plan_id: PlanId,
    ) -> Result<Vec<plan_entitlement::Model>> {
        self.transaction(|tx| async move {
            Ok(plan_entitlement::Entity::find()
                .filter(plan_entitlement::Column::PlanId.eq(plan_id))
                .order_by_asc(plan_entitlement::Column::Id)
                .all(&*tx)
                .await?)
        })
        .await
    }
}
