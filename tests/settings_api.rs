mod common;

use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn test_new_user_gets_default_settings() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let body = app.get("/api/settings", &token).await;
    assert_eq!(body["code"], 200);
    let data = &body["data"];
    assert_eq!(data["tradingHomework"].as_array().unwrap().len(), 3);
    assert_eq!(data["tradingPlans"].as_array().unwrap().len(), 3);
    assert_eq!(data["tradingHomework"][0]["title"], "Review yesterday's trades");
    assert_eq!(data["tradingPlans"][0]["title"], "Entry criteria");
    assert!(data["presetPrinciples"].as_array().unwrap().is_empty());
    assert!(data["customPrinciples"].as_array().unwrap().is_empty());

    // Second read returns the same persisted ids.
    let again = app.get("/api/settings", &token).await;
    assert_eq!(again["data"]["tradingHomework"], data["tradingHomework"]);
}

#[tokio::test]
async fn test_update_settings_filters_blank_entries() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let body = app
        .put(
            "/api/settings",
            &token,
            json!({
                "presetPrinciples": [{ "index": 2, "isSelected": true }],
                "customPrinciples": ["  Respect the stop ", ""],
                "tradingPlans": [
                    { "title": "  Scalp the open ", "content": "first 30 minutes" },
                    { "title": "   ", "content": "dropped" }
                ]
            }),
        )
        .await;
    assert_eq!(body["code"], 200, "{body}");
    let data = &body["data"];
    assert_eq!(data["presetPrinciples"][0]["index"], 2);
    assert_eq!(data["presetPrinciples"][0]["isSelected"], true);
    assert_eq!(data["customPrinciples"], json!(["Respect the stop"]));
    assert_eq!(data["tradingPlans"].as_array().unwrap().len(), 1);
    assert_eq!(data["tradingPlans"][0]["title"], "Scalp the open");
    // untouched
    assert_eq!(data["tradingHomework"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_empty_lists_are_backfilled_on_read() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let body = app
        .put("/api/settings", &token, json!({ "tradingHomework": [] }))
        .await;
    assert!(body["data"]["tradingHomework"].as_array().unwrap().is_empty());

    let body = app.get("/api/settings", &token).await;
    assert_eq!(body["data"]["tradingHomework"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_homework_item_lifecycle() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let added = app
        .post(
            "/api/settings/homework",
            &token,
            json!({ "title": " Update the trade log ", "content": "" }),
        )
        .await;
    assert_eq!(added["code"], 200);
    assert_eq!(added["data"]["title"], "Update the trade log");
    let id = added["data"]["id"].as_str().unwrap().to_string();

    let updated = app
        .put(
            &format!("/api/settings/homework/{id}"),
            &token,
            json!({ "content": "before the close" }),
        )
        .await;
    assert_eq!(updated["code"], 200);
    assert_eq!(updated["data"]["title"], "Update the trade log");
    assert_eq!(updated["data"]["content"], "before the close");

    let deleted = app.delete(&format!("/api/settings/homework/{id}"), &token).await;
    assert_eq!(deleted["code"], 200);

    let settings = app.get("/api/settings", &token).await;
    assert_eq!(settings["data"]["tradingHomework"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_sub_item_is_not_found_and_parent_unchanged() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;
    let before = app.get("/api/settings", &token).await["data"].clone();

    let missing = "00000000-0000-4000-8000-000000000000";
    let updated = app
        .put(
            &format!("/api/settings/plans/{missing}"),
            &token,
            json!({ "title": "changed" }),
        )
        .await;
    assert_eq!(updated["code"], 404);

    let deleted = app.delete(&format!("/api/settings/plans/{missing}"), &token).await;
    assert_eq!(deleted["code"], 404);

    let after = app.get("/api/settings", &token).await["data"].clone();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_malformed_sub_item_id_is_not_found() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;
    let before = app.get("/api/settings", &token).await["data"].clone();

    let deleted = app.delete("/api/settings/homework/not-a-uuid", &token).await;
    assert_eq!(deleted["code"], 404);
    assert_eq!(deleted["message"], "Item not found");

    let updated = app
        .put("/api/settings/plans/42", &token, json!({ "title": "changed" }))
        .await;
    assert_eq!(updated["code"], 404);

    let after = app.get("/api/settings", &token).await["data"].clone();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_sub_item_without_settings_document_is_not_found() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let body = app
        .delete(
            "/api/settings/homework/00000000-0000-4000-8000-000000000000",
            &token,
        )
        .await;
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "Settings not found");
}

#[tokio::test]
async fn test_blank_title_is_rejected() {
    let app = TestApp::new().await;
    let token = app.register("alice", "13812345678", "secret1").await;

    let body = app
        .post("/api/settings/plans", &token, json!({ "title": "   " }))
        .await;
    assert_eq!(body["code"], 400);

    let plans = app.get("/api/settings", &token).await["data"]["tradingPlans"].clone();
    let id = plans[0]["id"].as_str().unwrap();
    let body = app
        .put(&format!("/api/settings/plans/{id}"), &token, json!({ "title": "" }))
        .await;
    assert_eq!(body["code"], 400);
}
