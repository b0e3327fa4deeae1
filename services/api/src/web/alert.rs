//! services/api/src/web/alert.rs
//!
//! Emergency alert dispatch and the nearby-hospital lookup.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use medvault_core::domain::{Coordinates, RankedHospital};
use medvault_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema, IntoParams, Default, Clone, Copy)]
pub struct LocationPayload {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationPayload {
    fn coordinates(self) -> Result<Coordinates, PortError> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
            }),
            _ => Err(PortError::Validation(
                "Both latitude and longitude are required".to_string(),
            )),
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
pub struct AlertPayload {
    pub location: Option<LocationPayload>,
}

#[derive(Serialize, ToSchema)]
pub struct HospitalSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub distance_km: f64,
}

impl From<RankedHospital> for HospitalSummary {
    fn from(ranked: RankedHospital) -> Self {
        Self {
            id: ranked.hospital.id,
            name: ranked.hospital.name,
            address: ranked.hospital.address,
            phone: ranked.hospital.phone,
            distance_km: ranked.distance_km,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AlertResponse {
    pub status: String,
    /// The emergency contact number in international form.
    pub recipient: String,
    pub message: String,
    pub nearby_hospitals: Vec<HospitalSummary>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Calls and texts the caller's emergency contact with their location.
#[utoipa::path(
    post,
    path = "/api/send-message",
    request_body = AlertPayload,
    responses(
        (status = 200, description = "Alert dispatched", body = AlertResponse),
        (status = 400, description = "Missing location or malformed contact number"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No emergency profile found"),
        (status = 502, description = "The notification gateway rejected the alert")
    )
)]
pub async fn send_alert_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<AlertPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let location = payload
        .location
        .ok_or_else(|| PortError::Validation("Location is required".to_string()))
        .and_then(LocationPayload::coordinates)
        .map_err(port_error_response)?;

    let report = state.alerts.dispatch(user_id, location).await.map_err(|e| {
        match &e {
            PortError::Validation(_) | PortError::NotFound(_) => {
                warn!("Alert for user {} rejected: {}", user_id, e)
            }
            _ => error!("Alert for user {} failed: {:?}", user_id, e),
        }
        port_error_response(e)
    })?;
    info!(
        "Alert dispatched for user {} with {} hospitals",
        user_id,
        report.hospitals.len()
    );

    Ok(Json(AlertResponse {
        status: "sent".to_string(),
        recipient: report.recipient,
        message: report.message,
        nearby_hospitals: report.hospitals.into_iter().map(HospitalSummary::from).collect(),
    }))
}

/// Up to five verified hospitals within 10 km, nearest first.
#[utoipa::path(
    get,
    path = "/api/hospitals/nearby",
    params(LocationPayload),
    responses(
        (status = 200, description = "Nearby hospitals", body = [HospitalSummary]),
        (status = 400, description = "Missing or out-of-range coordinates"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn nearby_hospitals_handler(
    State(state): State<Arc<AppState>>,
    Query(location): Query<LocationPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let location = location.coordinates().map_err(port_error_response)?;
    let hospitals = state
        .alerts
        .nearby_hospitals(location)
        .await
        .map_err(|e| {
            if !matches!(e, PortError::Validation(_)) {
                error!("Hospital lookup failed: {:?}", e);
            }
            port_error_response(e)
        })?;
    let summaries: Vec<HospitalSummary> =
        hospitals.into_iter().map(HospitalSummary::from).collect();
    Ok(Json(summaries))
}
