mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::TestApp;
use serde_json::json;

async fn app_with_allergies(allergies: &str) -> (TestApp, String) {
    let app = TestApp::new();
    let session = app.signup("ngozi").await;
    app.create_profile(&session, json!({ "allergies": allergies }))
        .await;
    (app, session)
}

#[tokio::test]
async fn matches_are_tiered_by_confidence() {
    let (app, session) = app_with_allergies("Peanuts, eggs").await;
    app.classifier.allergen_for("groundnut soup", "peanut", 0.92);
    app.classifier.allergen_for("omelette", "Eggs", 0.5);
    app.classifier.allergen_for("custard", "egg", 0.2);
    app.classifier.allergen_for("cake", "egg", 0.45);

    for (food, expected) in [
        ("groundnut soup", "high"),
        ("omelette", "medium"),
        ("custard", "low"),
        ("cake", "high"),
    ] {
        let response = app
            .post("/api/scan-food", Some(&session), json!({ "food_name": food }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        let body = response.json();
        assert_eq!(body["risk_level"], expected, "food {}", food);
        assert_eq!(body["food_name"], food);
    }
}

#[tokio::test]
async fn no_match_names_the_food() {
    let (app, session) = app_with_allergies("penicillin").await;
    app.classifier.allergen_for("jollof rice", "none", 0.3);

    let response = app
        .post(
            "/api/scan-food",
            Some(&session),
            json!({ "food_name": "jollof rice" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["risk_level"], "No allergen found in jollof rice");
    assert_eq!(body["detected_allergen"], "none");
    assert_eq!(body["confidence"], 0.3);
}

#[tokio::test]
async fn images_are_recognised_before_assessment() {
    let (app, session) = app_with_allergies("peanut").await;
    let url = "https://cdn.example.com/meals/42.jpg";
    app.classifier.recognise_image(url, "peanut butter");
    app.classifier.allergen_for("peanut butter", "peanuts", 0.8);

    let response = app
        .post("/api/scan-food", Some(&session), json!({ "food_image": url }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    let body = response.json();
    assert_eq!(body["food_name"], "peanut butter");
    assert_eq!(body["food_image"], url);
    assert_eq!(body["risk_level"], "high");
}

#[tokio::test]
async fn exactly_one_descriptor_is_required() {
    let (app, session) = app_with_allergies("peanut").await;

    let both = app
        .post(
            "/api/scan-food",
            Some(&session),
            json!({ "food_name": "suya", "food_image": "https://cdn.example.com/suya.jpg" }),
        )
        .await;
    assert_eq!(both.status, StatusCode::BAD_REQUEST);

    let neither = app
        .post("/api/scan-food", Some(&session), json!({ "food_name": "  " }))
        .await;
    assert_eq!(neither.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.db.scan_count().await, 0);
}

#[tokio::test]
async fn failed_scans_leave_no_record() {
    let (app, session) = app_with_allergies("peanut").await;
    app.classifier.fail();

    let response = app
        .post("/api/scan-food", Some(&session), json!({ "food_name": "suya" }))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "Failed to scan food");
    assert_eq!(app.db.scan_count().await, 0);

    let unknown_image = TestApp::new();
    let session = unknown_image.signup("obi").await;
    unknown_image.create_profile(&session, json!({})).await;
    let response = unknown_image
        .post(
            "/api/scan-food",
            Some(&session),
            json!({ "food_image": "https://cdn.example.com/blurry.jpg" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(unknown_image.db.scan_count().await, 0);
}

#[tokio::test]
async fn scanning_without_a_profile_is_not_found() {
    let app = TestApp::new();
    let session = app.signup("tunde").await;
    let response = app
        .post("/api/scan-food", Some(&session), json!({ "food_name": "suya" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.db.scan_count().await, 0);
}

#[tokio::test]
async fn history_is_newest_first_and_private() {
    let (app, session) = app_with_allergies("egg").await;
    for food in ["bread", "akara", "moi moi"] {
        let response = app
            .post("/api/scan-food", Some(&session), json!({ "food_name": food }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        app.clock.advance(Duration::minutes(1));
    }

    let other = app.signup("kemi").await;
    let empty = app.get("/api/scan-history", Some(&other)).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.json().as_array().unwrap().len(), 0);

    let history = app.get("/api/scan-history", Some(&session)).await.json();
    let names: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|scan| scan["food_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["moi moi", "akara", "bread"]);
}

#[tokio::test]
async fn multi_word_and_oes_plurals_still_match() {
    let (app, session) = app_with_allergies("tree nuts, Tomatoes").await;
    app.classifier.allergen_for("pesto", "tree nut", 0.9);
    app.classifier.allergen_for("salsa", "tomato", 0.6);
    app.classifier.allergen_for("ketchup", "tomatoes", 0.3);

    for (food, expected) in [("pesto", "high"), ("salsa", "medium"), ("ketchup", "low")] {
        let response = app
            .post("/api/scan-food", Some(&session), json!({ "food_name": food }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        assert_eq!(response.json()["risk_level"], expected, "food {}", food);
    }
}
