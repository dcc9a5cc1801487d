use super::*;
use sea_orm::sea_query::{Expr, Func};

#[derive(Debug)]
pub struct AssignPlanParams {
    pub club_id: String,
    pub plan_id: PlanId,
    pub game_credits_remaining: Option<i32>,
    pub overrides: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Database {
    /// Assigns a plan to a club.
    ///
    /// The first assignment creates the club's plan row with the given credits and overrides.
    /// Later assignments switch the plan and replace the overrides but leave the credit balance
    /// alone; credits only move through [`Database::consume_club_credit`] and
    /// [`Database::grant_club_credits`].
    pub async fn assign_plan(&self, params: &AssignPlanParams) -> Result<club_plan::Model> {
        let overrides = params
            .overrides
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.transaction(|tx| {
            let overrides = overrides.clone();
            async move {
                let now = chrono::Utc::now().naive_utc();
                let existing = club_plan::Entity::find_by_id(params.club_id.clone())
                    .one(&*tx)
                    .await?;

                let club_plan = if let Some(existing) = existing {
                    club_plan::ActiveModel {
                        plan_id: ActiveValue::set(params.plan_id),
                        overrides: ActiveValue::set(overrides),
                        updated_at: ActiveValue::set(now),
                        ..existing.into_active_model()
                    }
                    .update(&*tx)
                    .await?
                } else {
                    club_plan::Entity::insert(club_plan::ActiveModel {
                        club_id: ActiveValue::set(params.club_id.clone()),
                        plan_id: ActiveValue::set(params.plan_id),
                        game_credits_remaining: ActiveValue::set(params.game_credits_remaining),
                        overrides: ActiveValue::set(overrides),
                        updated_at: ActiveValue::set(now),
                    })
                    .exec_with_returning(&*tx)
                    .await?
                };

                Ok(club_plan)
            }
        })
        .await
    }

    /// Returns the plan row for the given club.
    pub async fn get_club_plan(&self, club_id: &str) -> Result<Option<club_plan::Model>> {
        self.transaction(|tx| async move {
            Ok(club_plan::Entity::find_by_id(club_id.to_string())
                .one(&*tx)
                .await?)
        })
        .await
    }

    /// Returns the plan row for the given club along with the plan it points at. The plan is
    /// `None` if the row references a plan that no longer exists.
    pub async fn get_club_plan_with_plan(
        &self,
        club_id: &str,
    ) -> Result<Option<(club_plan::Model, Option<plan::Model>)>> {
        self.transaction(|tx| async move {
            Ok(club_plan::Entity::find_by_id(club_id.to_string())
                .find_also_related(plan::Entity)
                .one(&*tx)
                .await?)
        })
        .await
    }

    /// Replaces the overrides stored for the given club. Returns whether the club has a plan row.
    pub async fn set_club_plan_overrides(
        &self,
        club_id: &str,
        overrides: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<bool> {
        let overrides = overrides.map(serde_json::to_string).transpose()?;
        self.transaction(|tx| {
            let overrides = overrides.clone();
            async move {
                let result = club_plan::Entity::update_many()
                    .col_expr(club_plan::Column::Overrides, Expr::value(overrides))
                    .col_expr(
                        club_plan::Column::UpdatedAt,
                        Expr::value(chrono::Utc::now().naive_utc()),
                    )
                    .filter(club_plan::Column::ClubId.eq(club_id))
                    .exec(&*tx)
                    .await?;

                Ok(result.rows_affected > 0)
            }
        })
        .await
    }

    /// Takes one credit from the club, provided it has at least one left.
    ///
    /// The balance check and the decrement are a single conditional `UPDATE`, so concurrent
    /// callers can never drive the balance below zero. Returns whether a credit was taken.
    pub async fn consume_club_credit(&self, club_id: &str) -> Result<bool> {
        self.transaction(|tx| async move {
            let result = club_plan::Entity::update_many()
                .col_expr(
                    club_plan::Column::GameCreditsRemaining,
                    Expr::col(club_plan::Column::GameCreditsRemaining).sub(1),
                )
                .col_expr(
                    club_plan::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now().naive_utc()),
                )
                .filter(club_plan::Column::ClubId.eq(club_id))
                .filter(club_plan::Column::GameCreditsRemaining.gt(0))
                .exec(&*tx)
                .await?;

            Ok(result.rows_affected == 1)
        })
        .await
    }

    /// Adds `amount` credits to the club's balance, treating a missing balance as zero.
    /// Returns whether the club has a plan row; no row is created.
    pub async fn grant_club_credits(&self, club_id: &str, amount: i32) -> Result<bool> {
        self.transaction(|tx| async move {
            let result = club_plan::Entity::update_many()
                .col_expr(
                    club_plan::Column::GameCreditsRemaining,
                    Expr::expr(Func::coalesce([
                        Expr::col(club_plan::Column::GameCreditsRemaining).into(),
                        Expr::val(0).into(),
                    ]))
                    .add(amount),
                )
                .col_expr(
                    club_plan::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now().naive_utc()),
                )
                .filter(club_plan::Column::ClubId.eq(club_id))
                .exec(&*tx)
                .await?;

            Ok(result.rows_affected == 1)
        })
        .await
    }
}
