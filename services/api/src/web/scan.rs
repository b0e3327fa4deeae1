//! services/api/src/web/scan.rs
//!
//! Food allergen scanning and scan history.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use medvault_core::domain::FoodAllergyScan;
use medvault_core::ports::PortError;
use medvault_core::ScanRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema, Default)]
pub struct ScanPayload {
    /// Name of the food as typed by the user.
    pub food_name: Option<String>,
    /// URL of a photo of the meal.
    pub food_image: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ScanResponse {
    pub id: Uuid,
    pub food_name: Option<String>,
    pub food_image: Option<String>,
    pub detected_allergen: Option<String>,
    pub confidence: Option<f64>,
    /// "low", "medium", "high", or a no-match message.
    pub risk_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FoodAllergyScan> for ScanResponse {
    fn from(scan: FoodAllergyScan) -> Self {
        Self {
            id: scan.id,
            food_name: scan.food_name,
            food_image: scan.food_image,
            detected_allergen: scan.detected_allergen,
            confidence: scan.confidence,
            risk_level: scan.risk_level,
            created_at: scan.created_at,
        }
    }
}

/// Checks a food against the caller's recorded allergies.
#[utoipa::path(
    post,
    path = "/api/scan-food",
    request_body = ScanPayload,
    responses(
        (status = 201, description = "Scan completed", body = ScanResponse),
        (status = 400, description = "Provide exactly one of food_name or food_image"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No emergency profile found"),
        (status = 500, description = "Failed to scan food")
    )
)]
pub async fn scan_food_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<ScanPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = ScanRequest {
        food_name: payload.food_name,
        food_image: payload.food_image,
    };

    let scan = state
        .allergens
        .scan(user_id, request)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) | PortError::Validation(_) => port_error_response(e),
            other => {
                error!("Food scan for user {} failed: {:?}", user_id, other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to scan food".to_string())
            }
        })?;
    info!("Scan {} for user {}: {:?}", scan.id, user_id, scan.risk_level);

    Ok((StatusCode::CREATED, Json(ScanResponse::from(scan))))
}

/// The caller's past scans, newest first.
#[utoipa::path(
    get,
    path = "/api/scan-history",
    responses(
        (status = 200, description = "Scan history", body = [ScanResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn scan_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let scans = state.db.list_scans_for_user(user_id).await.map_err(|e| {
        error!("Failed to list scans for user {}: {:?}", user_id, e);
        port_error_response(e)
    })?;
    let history: Vec<ScanResponse> = scans.into_iter().map(ScanResponse::from).collect();
    Ok(Json(history))
}
