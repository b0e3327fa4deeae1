//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the emergency profile endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::port_error_response;
use crate::web::{alert, auth, scan, state::AppState, token};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use medvault_core::domain::{EmergencyProfile, ProfileUpdate};
use medvault_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        get_profile_handler,
        save_profile_handler,
        token::get_qrcode_handler,
        token::activate_qrcode_handler,
        token::deactivate_qrcode_handler,
        token::token_status_handler,
        scan::scan_food_handler,
        scan::scan_history_handler,
        alert::send_alert_handler,
        alert::nearby_hospitals_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            ProfilePayload,
            ProfileResponse,
            token::TokenStatusResponse,
            token::TokenValidityResponse,
            scan::ScanPayload,
            scan::ScanResponse,
            alert::AlertPayload,
            alert::LocationPayload,
            alert::AlertResponse,
            alert::HospitalSummary,
        )
    ),
    tags(
        (name = "MedVault API", description = "Emergency profiles, time-limited QR disclosure, allergen scanning and emergency alerts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Profile fields submitted by the owner. Omitted fields are left unchanged.
#[derive(Deserialize, ToSchema, Default)]
pub struct ProfilePayload {
    pub blood_type: Option<String>,
    pub genotype: Option<String>,
    pub weight: Option<f64>,
    pub allergies: Option<String>,
    pub conditions: Option<String>,
    pub medications: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub vaccination_history: Option<BTreeMap<String, String>>,
    pub dietary_restrictions: Option<String>,
    pub smoking_status: Option<String>,
    pub alcohol_consumption: Option<String>,
    pub physical_activity_level: Option<String>,
}

impl From<ProfilePayload> for ProfileUpdate {
    fn from(p: ProfilePayload) -> Self {
        ProfileUpdate {
            blood_type: p.blood_type,
            genotype: p.genotype,
            weight: p.weight,
            allergies: p.allergies,
            conditions: p.conditions,
            medications: p.medications,
            emergency_contact_name: p.emergency_contact_name,
            emergency_contact_phone: p.emergency_contact_phone,
            vaccination_history: p.vaccination_history,
            dietary_restrictions: p.dietary_restrictions,
            smoking_status: p.smoking_status,
            alcohol_consumption: p.alcohol_consumption,
            physical_activity_level: p.physical_activity_level,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub blood_type: String,
    pub genotype: String,
    pub weight: f64,
    pub allergies: String,
    pub conditions: String,
    pub medications: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub vaccination_history: BTreeMap<String, String>,
    pub dietary_restrictions: String,
    pub smoking_status: String,
    pub alcohol_consumption: String,
    pub physical_activity_level: String,
    /// Present once a QR code has been issued.
    pub qr_token: Option<Uuid>,
}

impl ProfileResponse {
    fn new(profile: EmergencyProfile, qr_token: Option<Uuid>) -> Self {
        Self {
            id: profile.id,
            blood_type: profile.blood_type,
            genotype: profile.genotype,
            weight: profile.weight,
            allergies: profile.allergies,
            conditions: profile.conditions,
            medications: profile.medications,
            emergency_contact_name: profile.emergency_contact_name,
            emergency_contact_phone: profile.emergency_contact_phone,
            vaccination_history: profile.vaccination_history,
            dietary_restrictions: profile.dietary_restrictions,
            smoking_status: profile.smoking_status,
            alcohol_consumption: profile.alcohol_consumption,
            physical_activity_level: profile.physical_activity_level,
            qr_token,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Fetch the caller's emergency profile.
#[utoipa::path(
    get,
    path = "/api/emergency-profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No profile found")
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .db
        .get_profile_by_user(user_id)
        .await
        .map_err(port_error_response)?;
    let qr_token = match state.db.get_token_by_profile(profile.id).await {
        Ok(token) => Some(token.identifier),
        Err(PortError::NotFound(_)) => None,
        Err(e) => {
            error!("Failed to load QR code for profile {}: {:?}", profile.id, e);
            return Err(port_error_response(e));
        }
    };
    Ok(Json(ProfileResponse::new(profile, qr_token)))
}

/// Create the caller's emergency profile, or update the fields supplied.
///
/// Every successful save (re)issues the profile's QR code. Creation answers
/// 201, updates of an existing profile answer 200.
#[utoipa::path(
    post,
    path = "/api/emergency-profile",
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Profile updated and QR code re-rendered", body = ProfileResponse),
        (status = 201, description = "Profile created and QR code issued", body = ProfileResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn save_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<ProfilePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = ProfileUpdate::from(payload);

    let (profile, status) = match state.db.get_profile_by_user(user_id).await {
        Ok(mut existing) => {
            update.apply_to(&mut existing).map_err(port_error_response)?;
            (existing, StatusCode::OK)
        }
        Err(PortError::NotFound(_)) => {
            let created = update
                .into_new_profile(user_id)
                .map_err(port_error_response)?;
            (created, StatusCode::CREATED)
        }
        Err(e) => {
            error!("Failed to load profile for user {}: {:?}", user_id, e);
            return Err(port_error_response(e));
        }
    };

    state.db.save_profile(&profile).await.map_err(|e| {
        error!("Failed to save profile for user {}: {:?}", user_id, e);
        port_error_response(e)
    })?;

    let token = state.tokens.issue(&profile).await.map_err(|e| {
        error!("Failed to issue QR code for profile {}: {:?}", profile.id, e);
        port_error_response(e)
    })?;
    info!("Saved emergency profile {} for user {}", profile.id, user_id);

    Ok((status, Json(ProfileResponse::new(profile, Some(token.identifier)))))
}
