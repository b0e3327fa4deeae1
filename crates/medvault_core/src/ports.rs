//! crates/medvault_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AccessToken, Classification, EmergencyProfile, FoodAllergyScan, Hospital, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream provider failed: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Auth ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user if the session exists and has not expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Emergency Profiles ---
    async fn get_profile_by_user(&self, user_id: Uuid) -> PortResult<EmergencyProfile>;

    async fn get_profile_by_id(&self, profile_id: Uuid) -> PortResult<EmergencyProfile>;

    /// Inserts the profile, or replaces the existing row with the same id.
    async fn save_profile(&self, profile: &EmergencyProfile) -> PortResult<()>;

    // --- Access Tokens ---
    async fn get_token_by_profile(&self, profile_id: Uuid) -> PortResult<AccessToken>;

    async fn get_token_by_identifier(&self, identifier: Uuid) -> PortResult<AccessToken>;

    async fn create_token(&self, token: &AccessToken) -> PortResult<()>;

    /// Persists the activation state of an existing token. The image is left alone.
    async fn update_token(&self, token: &AccessToken) -> PortResult<()>;

    /// Replaces only the rendered image of the token owned by `profile_id`.
    async fn update_token_image(&self, profile_id: Uuid, image_svg: &str) -> PortResult<()>;

    // --- Food Allergy Scans ---
    async fn create_scan(&self, scan: &FoodAllergyScan) -> PortResult<()>;

    async fn update_scan(&self, scan: &FoodAllergyScan) -> PortResult<()>;

    async fn delete_scan(&self, scan_id: Uuid) -> PortResult<()>;

    /// Newest first.
    async fn list_scans_for_user(&self, user_id: Uuid) -> PortResult<Vec<FoodAllergyScan>>;

    // --- Hospitals ---
    async fn list_verified_hospitals(&self) -> PortResult<Vec<Hospital>>;
}

#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// Identifies the meal shown in the image at `image_url`.
    async fn classify_image(&self, image_url: &str) -> PortResult<Classification>;

    /// Infers the most likely allergen contained in the named food.
    async fn classify_text(&self, descriptor: &str) -> PortResult<Classification>;
}

/// Folds plural nouns to their singular form.
pub trait Singularizer: Send + Sync {
    /// Returns the word unchanged when it is already singular or unrecognised.
    fn singularize(&self, word: &str) -> String;
}

/// Renders a disclosure URL into a scannable image.
pub trait QrRenderer: Send + Sync {
    /// Must be deterministic: the same URL always yields the same image.
    fn render(&self, url: &str) -> PortResult<String>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a text message to an already-normalised phone number.
    async fn send_sms(&self, to: &str, message: &str) -> PortResult<()>;

    /// Places a voice call that reads `message` to the recipient.
    async fn place_voice_call(&self, to: &str, message: &str) -> PortResult<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
