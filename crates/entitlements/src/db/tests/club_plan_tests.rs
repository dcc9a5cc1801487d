use super::*;
use crate::test_both_dbs;
use pretty_assertions::assert_eq;
use serde_json::json;

fn free_plan() -> NewPlanParams {
    NewPlanParams {
        code: "FREE".into(),
        name: "Free".into(),
        ..Default::default()
    }
}

test_both_dbs!(
    test_assign_plan,
    test_assign_plan_postgres,
    test_assign_plan_sqlite
);

async fn test_assign_plan(db: &Arc<Database>) {
    let (club, free) = new_club_on_plan(db, "harbour-rfc", &free_plan(), Some(3)).await;
    let club_plan = db.get_club_plan(&club.id).await.unwrap().unwrap();
    assert_eq!(club_plan.plan_id, free.id);
    assert_eq!(club_plan.game_credits_remaining, Some(3));
    assert_eq!(club_plan.overrides, None);

    let dev = db
        .create_plan(&NewPlanParams {
            code: "DEV".into(),
            name: "Development".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let overrides = json!({ "max_players_per_game": 100 });
    let reassigned = db
        .assign_plan(&AssignPlanParams {
            club_id: club.id.clone(),
            plan_id: dev.id,
            game_credits_remaining: Some(50),
            overrides: overrides.as_object().cloned(),
        })
        .await
        .unwrap();
    assert_eq!(reassigned.plan_id, dev.id);
    // Reassigning never touches the balance.
    assert_eq!(reassigned.game_credits_remaining, Some(3));
    assert_eq!(
        reassigned.overrides.as_deref(),
        Some(r#"{"max_players_per_game":100}"#)
    );

    let (club_plan, plan) = db
        .get_club_plan_with_plan(&club.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(club_plan, reassigned);
    assert_eq!(plan, Some(dev));

    assert_eq!(db.get_club_plan_with_plan("nobody").await.unwrap(), None);
}

test_both_dbs!(
    test_set_club_plan_overrides,
    test_set_club_plan_overrides_postgres,
    test_set_club_plan_overrides_sqlite
);

async fn test_set_club_plan_overrides(db: &Arc<Database>) {
    let (club, _) = new_club_on_plan(db, "harbour-rfc", &free_plan(), Some(3)).await;

    let overrides = json!({ "extras_allowed": "*" });
    assert!(db
        .set_club_plan_overrides(&club.id, overrides.as_object())
        .await
        .unwrap());
    assert_eq!(
        db.get_club_plan(&club.id)
            .await
            .unwrap()
            .unwrap()
            .overrides
            .as_deref(),
        Some(r#"{"extras_allowed":"*"}"#)
    );

    assert!(db.set_club_plan_overrides(&club.id, None).await.unwrap());
    assert_eq!(
        db.get_club_plan(&club.id).await.unwrap().unwrap().overrides,
        None
    );

    assert!(!db
        .set_club_plan_overrides("nobody", overrides.as_object())
        .await
        .unwrap());
}

test_both_dbs!(
    test_consume_club_credit,
    test_consume_club_credit_postgres,
    test_consume_club_credit_sqlite
);

async fn test_consume_club_credit(db: &Arc<Database>) {
    let (club, _) = new_club_on_plan(db, "harbour-rfc", &free_plan(), Some(2)).await;
    let before = db.get_club_plan(&club.id).await.unwrap().unwrap();

    assert!(db.consume_club_credit(&club.id).await.unwrap());
    assert!(db.consume_club_credit(&club.id).await.unwrap());
    assert!(!db.consume_club_credit(&club.id).await.unwrap());
    assert!(!db.consume_club_credit(&club.id).await.unwrap());

    let after = db.get_club_plan(&club.id).await.unwrap().unwrap();
    assert_eq!(after.game_credits_remaining, Some(0));
    assert!(after.updated_at >= before.updated_at);

    assert!(!db.consume_club_credit("nobody").await.unwrap());

    // A club whose balance was never set has nothing to consume.
    let (unset, _) = new_club_on_plan(db, "lakeside-gaa", &free_plan(), None).await;
    assert!(!db.consume_club_credit(&unset.id).await.unwrap());
}

test_both_dbs!(
    test_grant_club_credits,
    test_grant_club_credits_postgres,
    test_grant_club_credits_sqlite
);

async fn test_grant_club_credits(db: &Arc<Database>) {
    let (club, _) = new_club_on_plan(db, "harbour-rfc", &free_plan(), Some(3)).await;
    assert!(db.grant_club_credits(&club.id, 5).await.unwrap());
    assert_eq!(
        db.get_club_plan(&club.id)
            .await
            .unwrap()
            .unwrap()
            .game_credits_remaining,
        Some(8)
    );

    let (unset, _) = new_club_on_plan(db, "lakeside-gaa", &free_plan(), None).await;
    assert!(db.grant_club_credits(&unset.id, 2).await.unwrap());
    assert_eq!(
        db.get_club_plan(&unset.id)
            .await
            .unwrap()
            .unwrap()
            .game_credits_remaining,
        Some(2)
    );

    new_club(db, "no-plan-fc").await;
    assert!(!db.grant_club_credits("no-plan-fc", 5).await.unwrap());
    assert_eq!(db.get_club_plan("no-plan-fc").await.unwrap(), None);
}
