mod common;

use axum::http::StatusCode;
use common::{Sent, TestApp};
use serde_json::json;

const LAT: f64 = 6.5244;
const LON: f64 = 3.3792;

async fn app_with_hospitals() -> (TestApp, String) {
    let app = TestApp::new();
    let session = app.signup("zainab").await;
    app.create_profile(&session, json!({ "allergies": "penicillin" }))
        .await;

    // Roughly 1.1 km, 5.6 km and 22 km north of the origin.
    app.add_hospital("Island Clinic", LAT + 0.05, LON, true).await;
    app.add_hospital("General Hospital", LAT + 0.01, LON, true).await;
    app.add_hospital("Far Away Medical", LAT + 0.2, LON, true).await;
    app.add_hospital("Unverified Care", LAT + 0.005, LON, false).await;
    (app, session)
}

#[tokio::test]
async fn alert_calls_then_texts_the_normalised_contact() {
    let (app, session) = app_with_hospitals().await;

    let response = app
        .post(
            "/api/send-message",
            Some(&session),
            json!({ "location": { "latitude": LAT, "longitude": LON } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let body = response.json();
    assert_eq!(body["status"], "sent");
    assert_eq!(body["recipient"], "+2348031234567");

    let names: Vec<&str> = body["nearby_hospitals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["General Hospital", "Island Clinic"]);
    assert_eq!(body["nearby_hospitals"][0]["distance_km"], 1.11);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 2);
    match (&sent[0], &sent[1]) {
        (Sent::Voice { to: voice_to, .. }, Sent::Sms { to: sms_to, message }) => {
            assert_eq!(voice_to, "+2348031234567");
            assert_eq!(sms_to, "+2348031234567");
            assert!(message.contains("zainab needs urgent help"));
            assert!(message.contains("Allergies: penicillin."));
            assert!(message.contains("1. General Hospital"));
            assert!(!message.contains("Far Away Medical"));
        }
        other => panic!("unexpected dispatch order: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_contact_number_is_rejected_before_dispatch() {
    let (app, session) = app_with_hospitals().await;
    app.post(
        "/api/emergency-profile",
        Some(&session),
        json!({ "emergency_contact_phone": "12345" }),
    )
    .await;

    let response = app
        .post(
            "/api/send-message",
            Some(&session),
            json!({ "location": { "latitude": LAT, "longitude": LON } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("Malformed phone number"));
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn location_is_required_and_range_checked() {
    let (app, session) = app_with_hospitals().await;

    for body in [
        json!({}),
        json!({ "location": { "latitude": LAT } }),
        json!({ "location": { "latitude": 91.0, "longitude": LON } }),
        json!({ "location": { "latitude": LAT, "longitude": -181.0 } }),
    ] {
        let response = app
            .post("/api/send-message", Some(&session), body.clone())
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {}", body);
    }
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn gateway_failures_surface_as_bad_gateway() {
    let (app, session) = app_with_hospitals().await;
    app.notifier.fail();

    let response = app
        .post(
            "/api/send-message",
            Some(&session),
            json!({ "location": { "latitude": LAT, "longitude": LON } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.text().contains("insufficient balance"));
}

#[tokio::test]
async fn alert_without_profile_is_not_found() {
    let app = TestApp::new();
    let session = app.signup("musa").await;
    let response = app
        .post(
            "/api/send-message",
            Some(&session),
            json!({ "location": { "latitude": LAT, "longitude": LON } }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nearby_lookup_ranks_without_dispatching() {
    let (app, session) = app_with_hospitals().await;

    let response = app
        .get(
            &format!("/api/hospitals/nearby?latitude={}&longitude={}", LAT, LON),
            Some(&session),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let hospitals = response.json();
    let hospitals = hospitals.as_array().unwrap();
    assert_eq!(hospitals.len(), 2);
    assert_eq!(hospitals[0]["name"], "General Hospital");
    assert_eq!(hospitals[1]["distance_km"], 5.56);
    assert!(app.notifier.sent().is_empty());

    let missing = app
        .get("/api/hospitals/nearby?latitude=6.5", Some(&session))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let anonymous = app
        .get("/api/hospitals/nearby?latitude=6.5&longitude=3.3", None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
