//! crates/medvault_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
}

// Represents a login session (cookie or bearer value)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The medical information disclosed to first responders. One per user.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub blood_type: String,
    pub genotype: String,
    pub weight: f64,
    /// Comma-separated, free text.
    pub allergies: String,
    pub conditions: String,
    pub medications: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    /// Vaccine name to date or status.
    pub vaccination_history: BTreeMap<String, String>,
    pub dietary_restrictions: String,
    pub smoking_status: String,
    pub alcohol_consumption: String,
    pub physical_activity_level: String,
}

/// A partial set of profile fields submitted by the owner.
///
/// Applied on top of an existing profile, or turned into a fresh one when the
/// user has none yet.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
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

/// The time-limited public-access token attached to a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub profile_id: Uuid,
    /// Immutable once created; embedded in the disclosure URL.
    pub identifier: Uuid,
    /// Rendered QR code (SVG). Derived from `identifier`.
    pub image_svg: String,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

/// One allergen scan request and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodAllergyScan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_name: Option<String>,
    pub food_image: Option<String>,
    pub detected_allergen: Option<String>,
    pub confidence: Option<f64>,
    pub risk_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A label produced by an external classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Directory entry for a hospital. Read-only for this service.
#[derive(Debug, Clone, PartialEq)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_verified: bool,
}

/// A hospital selected by the nearest-hospital ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHospital {
    pub hospital: Hospital,
    /// Kilometres, rounded to two decimals.
    pub distance_km: f64,
}
