//! services/api/src/web/token.rs
//!
//! Handlers for the profile's QR code: owner-side status, activation and
//! deactivation, plus the public validity check used by scanners.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use medvault_core::access_token::{TokenStatus, ACTIVATION_WINDOW_MINUTES};
use medvault_core::ports::{PortError, PortResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct TokenStatusResponse {
    pub qr_token: Uuid,
    pub disclosure_url: String,
    /// SVG markup of the QR code.
    pub qr_image_svg: String,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    /// Whole minutes left in the activation window; absent once expired.
    pub remaining_minutes: Option<i64>,
    pub window_minutes: i64,
}

impl From<TokenStatus> for TokenStatusResponse {
    fn from(status: TokenStatus) -> Self {
        Self {
            qr_token: status.token.identifier,
            disclosure_url: status.disclosure_url,
            qr_image_svg: status.token.image_svg,
            is_active: status.token.is_active,
            activated_at: status.token.activated_at,
            is_expired: status.is_expired,
            remaining_minutes: status.remaining_minutes,
            window_minutes: ACTIVATION_WINDOW_MINUTES,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TokenValidityResponse {
    pub valid: bool,
}

/// Unparseable identifiers cannot name a token, so they are reported as not found.
pub fn parse_identifier(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| PortError::NotFound("Emergency link not found".to_string()))
}

fn log_failure(action: &str, user_id: Uuid, e: &PortError) {
    match e {
        PortError::NotFound(_) => info!("{} for user {}: {}", action, user_id, e),
        _ => error!("{} for user {} failed: {:?}", action, user_id, e),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Current QR code and activation metadata for the caller.
#[utoipa::path(
    get,
    path = "/api/qrcode",
    responses(
        (status = 200, description = "QR code status", body = TokenStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No emergency profile found")
    )
)]
pub async fn get_qrcode_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = state.tokens.status(user_id).await.map_err(|e| {
        log_failure("QR status", user_id, &e);
        port_error_response(e)
    })?;
    Ok(Json(TokenStatusResponse::from(status)))
}

/// Opens (or restarts) the activation window of the caller's QR code.
#[utoipa::path(
    post,
    path = "/api/qrcode/activate",
    responses(
        (status = 200, description = "QR code activated", body = TokenStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No emergency profile found")
    )
)]
pub async fn activate_qrcode_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = state.tokens.activate(user_id).await.map_err(|e| {
        log_failure("QR activation", user_id, &e);
        port_error_response(e)
    })?;
    info!("QR code {} activated", status.token.identifier);
    Ok(Json(TokenStatusResponse::from(status)))
}

/// Closes the activation window immediately.
#[utoipa::path(
    post,
    path = "/api/qrcode/deactivate",
    responses(
        (status = 200, description = "QR code deactivated", body = TokenStatusResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No emergency profile found")
    )
)]
pub async fn deactivate_qrcode_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = state.tokens.deactivate(user_id).await.map_err(|e| {
        log_failure("QR deactivation", user_id, &e);
        port_error_response(e)
    })?;
    info!("QR code {} deactivated", status.token.identifier);
    Ok(Json(TokenStatusResponse::from(status)))
}

/// Public check of whether a scanned QR code currently grants access.
#[utoipa::path(
    get,
    path = "/api/emergency/{token}/status",
    params(
        ("token" = String, Path, description = "The QR code identifier.")
    ),
    responses(
        (status = 200, description = "The link is valid", body = TokenValidityResponse),
        (status = 403, description = "The link is inactive or expired"),
        (status = 404, description = "Unknown link")
    )
)]
pub async fn token_status_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let identifier = parse_identifier(&token).map_err(port_error_response)?;
    state
        .tokens
        .public_lookup(identifier)
        .await
        .map_err(port_error_response)?;
    Ok(Json(TokenValidityResponse { valid: true }))
}
