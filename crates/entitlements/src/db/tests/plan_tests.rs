use super::*;
use crate::test_both_dbs;
use pretty_assertions::assert_eq;
use serde_json::json;

test_both_dbs!(
    test_clubs_and_plans,
    test_clubs_and_plans_postgres,
    test_clubs_and_plans_sqlite
);

async fn test_clubs_and_plans(db: &Arc<Database>) {
    let club = new_club(db, "harbour-rfc").await;
    assert_eq!(db.get_club("harbour-rfc").await.unwrap(), Some(club));
    assert_eq!(db.get_club("nobody").await.unwrap(), None);

    let plan = db
        .create_plan(&NewPlanParams {
            code: "DEV".into(),
            name: "Development".into(),
            max_players: Some(50),
            round_types: Some("*".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(plan.code, "DEV");
    assert_eq!(plan.max_players, Some(50));
    assert_eq!(plan.max_rounds, None);

    assert_eq!(db.get_plan(plan.id).await.unwrap(), Some(plan.clone()));
    assert_eq!(db.get_plan_by_code("DEV").await.unwrap(), Some(plan));
    assert_eq!(db.get_plan_by_code("GOLD").await.unwrap(), None);
}

test_both_dbs!(
    test_plan_entitlements,
    test_plan_entitlements_postgres,
    test_plan_entitlements_sqlite
);

async fn test_plan_entitlements(db: &Arc<Database>) {
    let free = db
        .create_plan(&NewPlanParams {
            code: "FREE".into(),
            name: "Free".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let dev = db
        .create_plan(&NewPlanParams {
            code: "DEV".into(),
            name: "Development".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(db.get_plan_entitlements(free.id).await.unwrap().is_empty());

    let caps = db
        .set_plan_entitlement(free.id, "quiz", "caps", &json!({ "maxPlayers": 20 }))
        .await
        .unwrap();
    db.set_plan_entitlement(free.id, "quiz", "round_types", &json!(["wipeout"]))
        .await
        .unwrap();
    db.set_plan_entitlement(dev.id, "quiz", "caps", &json!({ "maxPlayers": 200 }))
        .await
        .unwrap();

    // Setting the same scope and key again replaces the value in place.
    let updated = db
        .set_plan_entitlement(free.id, "quiz", "caps", &json!({ "maxPlayers": 25 }))
        .await
        .unwrap();
    assert_eq!(updated.id, caps.id);

    let rows = db.get_plan_entitlements(free.id).await.unwrap();
    assert_eq!(
        rows.iter()
            .map(|row| (row.scope.as_str(), row.key.as_str(), row.value.as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("quiz", "caps", r#"{"maxPlayers":25}"#),
            ("quiz", "round_types", r#"["wipeout"]"#),
        ]
    );
    assert_eq!(db.get_plan_entitlements(dev.id).await.unwrap().len(), 1);
}
