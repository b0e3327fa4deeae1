//! Shared harness for the router-level tests: an in-memory store, a clock the
//! test can move, and fakes for every outbound provider.

#![allow(dead_code)]

use api_lib::adapters::{InflectorSingularizer, MemoryDbAdapter, SvgQrRenderer};
use api_lib::config::Config;
use api_lib::web::{
    self,
    state::{Adapters, AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use medvault_core::domain::{Classification, Hospital};
use medvault_core::ports::{
    ClassificationService, Clock, NotificationService, PortError, PortResult,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const BASE_URL: &str = "http://medvault.test";

//=========================================================================================
// Clock
//=========================================================================================

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

//=========================================================================================
// Classifier
//=========================================================================================

/// Answers from fixed tables; unknown inputs classify as "none" at 0.1.
#[derive(Default)]
pub struct FakeClassifier {
    images: Mutex<HashMap<String, String>>,
    allergens: Mutex<HashMap<String, Classification>>,
    failing: Mutex<bool>,
}

impl FakeClassifier {
    pub fn recognise_image(&self, url: &str, food: &str) {
        self.images
            .lock()
            .unwrap()
            .insert(url.to_string(), food.to_string());
    }

    pub fn allergen_for(&self, food: &str, allergen: &str, confidence: f64) {
        self.allergens.lock().unwrap().insert(
            food.to_string(),
            Classification {
                label: allergen.to_string(),
                confidence,
            },
        );
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    fn check(&self) -> PortResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(PortError::Upstream("classifier is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClassificationService for FakeClassifier {
    async fn classify_image(&self, image_url: &str) -> PortResult<Classification> {
        self.check()?;
        let label = self
            .images
            .lock()
            .unwrap()
            .get(image_url)
            .cloned()
            .ok_or_else(|| PortError::Upstream("no concepts returned".to_string()))?;
        Ok(Classification {
            label,
            confidence: 0.9,
        })
    }

    async fn classify_text(&self, descriptor: &str) -> PortResult<Classification> {
        self.check()?;
        Ok(self
            .allergens
            .lock()
            .unwrap()
            .get(descriptor)
            .cloned()
            .unwrap_or(Classification {
                label: "none".to_string(),
                confidence: 0.1,
            }))
    }
}

//=========================================================================================
// Notifier
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Sms { to: String, message: String },
    Voice { to: String, message: String },
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    fn record(&self, item: Sent) -> PortResult<()> {
        if *self.failing.lock().unwrap() {
            return Err(PortError::Upstream("gateway said: insufficient balance".to_string()));
        }
        self.sent.lock().unwrap().push(item);
        Ok(())
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_sms(&self, to: &str, message: &str) -> PortResult<()> {
        self.record(Sent::Sms {
            to: to.to_string(),
            message: message.to_string(),
        })
    }

    async fn place_voice_call(&self, to: &str, message: &str) -> PortResult<()> {
        self.record(Sent::Voice {
            to: to.to_string(),
            message: message.to_string(),
        })
    }
}

//=========================================================================================
// The Test Application
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: MemoryDbAdapter,
    pub clock: Arc<ManualClock>,
    pub classifier: Arc<FakeClassifier>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let db = MemoryDbAdapter::new(clock.clone());
        let classifier = Arc::new(FakeClassifier::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::new(
            Arc::new(Config::for_local(BASE_URL)),
            Adapters {
                db: Arc::new(db.clone()),
                classifier: classifier.clone(),
                notifier: notifier.clone(),
                qr_renderer: Arc::new(SvgQrRenderer),
                singularizer: Arc::new(InflectorSingularizer),
                clock: clock.clone(),
            },
        );
        let router = web::router(Arc::new(state)).unwrap();

        Self {
            router,
            db,
            clock,
            classifier,
            notifier,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, format!("session={}", session));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            body: body.to_vec(),
        }
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, session, None).await
    }

    pub async fn post(&self, uri: &str, session: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, session, Some(body)).await
    }

    /// Registers a user and returns their session token.
    pub async fn signup(&self, username: &str) -> String {
        let response = self
            .post(
                "/auth/signup",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct horse",
                    "password2": "correct horse",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["session_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Creates the caller's profile and returns the response body.
    pub async fn create_profile(&self, session: &str, extra: Value) -> Value {
        let mut profile = json!({
            "blood_type": "O+",
            "genotype": "AS",
            "weight": 72.5,
            "emergency_contact_name": "Ada Obi",
            "emergency_contact_phone": "08031234567",
        });
        if let (Some(base), Some(extra)) = (profile.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        let response = self
            .post("/api/emergency-profile", Some(session), profile)
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()
    }

    pub async fn add_hospital(&self, name: &str, latitude: f64, longitude: f64, verified: bool) {
        self.db
            .insert_hospital(Hospital {
                id: Uuid::new_v4(),
                name: name.to_string(),
                address: format!("{} Road", name),
                phone: "01-2345678".to_string(),
                latitude: Some(latitude),
                longitude: Some(longitude),
                is_verified: verified,
            })
            .await
            .unwrap();
    }
}
