//! crates/medvault_core/src/alert.rs
//!
//! Emergency alerts: locate nearby hospitals and notify the profile's
//! emergency contact by voice call and SMS.

use regex::Regex;
use std::fmt::Write as _;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Coordinates, EmergencyProfile, RankedHospital, User};
use crate::hospitals::{rank_nearest, validate_coordinates};
use crate::ports::{DatabaseService, NotificationService, PortError, PortResult};

const PHONE_SEPARATORS: &str = r"[\s\-.()]";
const INTERNATIONAL_PHONE: &str = r"^\+[0-9]{10,15}$";

fn pattern(source: &str) -> PortResult<Regex> {
    Regex::new(source)
        .map_err(|e| PortError::Unexpected(format!("Invalid pattern '{}': {}", source, e)))
}

/// Normalizes a phone number to international `+<digits>` form.
///
/// Local numbers with a leading `0` get `country_code` in its place, numbers
/// already starting with `country_code` get a `+`, and `+`-prefixed numbers
/// are kept. Spaces, dashes, dots and parentheses are ignored.
pub fn normalize_phone(raw: &str, country_code: &str) -> PortResult<String> {
    let compact = pattern(PHONE_SEPARATORS)?.replace_all(raw.trim(), "");

    let candidate = if compact.starts_with('+') {
        compact.into_owned()
    } else if let Some(rest) = compact.strip_prefix('0') {
        format!("+{}{}", country_code, rest)
    } else if compact.starts_with(country_code) {
        format!("+{}", compact)
    } else {
        return Err(malformed(raw));
    };

    if !pattern(INTERNATIONAL_PHONE)?.is_match(&candidate) {
        return Err(malformed(raw));
    }
    Ok(candidate)
}

fn malformed(raw: &str) -> PortError {
    PortError::Validation(format!("Malformed phone number: '{}'", raw))
}

pub fn maps_link(location: Coordinates) -> String {
    format!(
        "https://maps.google.com/?q={},{}",
        location.latitude, location.longitude
    )
}

/// The SMS body sent to the emergency contact.
pub fn compose_alert_message(
    user: &User,
    profile: &EmergencyProfile,
    location: Coordinates,
    hospitals: &[RankedHospital],
) -> String {
    let mut message = format!(
        "EMERGENCY ALERT: {} needs urgent help. Location: {}. Blood type: {}, genotype: {}.",
        user.username,
        maps_link(location),
        profile.blood_type,
        profile.genotype
    );
    if !profile.allergies.trim().is_empty() {
        let _ = write!(message, " Allergies: {}.", profile.allergies.trim());
    }

    if hospitals.is_empty() {
        message.push_str(" No verified hospitals found within 10 km.");
    } else {
        message.push_str(" Nearest hospitals:");
        for (rank, entry) in hospitals.iter().enumerate() {
            let _ = write!(
                message,
                " {}. {} ({} km",
                rank + 1,
                entry.hospital.name,
                entry.distance_km
            );
            if !entry.hospital.phone.is_empty() {
                let _ = write!(message, ", {}", entry.hospital.phone);
            }
            message.push(')');
        }
    }
    message
}

/// The short script read out on the voice call.
pub fn compose_voice_message(user: &User) -> String {
    format!(
        "This is an emergency alert from MedVault. {} needs urgent help. \
         Please check your text messages for their location and the nearest hospitals.",
        user.username
    )
}

/// Summary of a dispatched alert.
#[derive(Debug, Clone)]
pub struct AlertReport {
    pub recipient: String,
    pub message: String,
    pub hospitals: Vec<RankedHospital>,
}

#[derive(Clone)]
pub struct EmergencyAlerter {
    db: Arc<dyn DatabaseService>,
    notifier: Arc<dyn NotificationService>,
    country_code: String,
}

impl EmergencyAlerter {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        notifier: Arc<dyn NotificationService>,
        country_code: String,
    ) -> Self {
        Self {
            db,
            notifier,
            country_code,
        }
    }

    pub async fn nearby_hospitals(&self, location: Coordinates) -> PortResult<Vec<RankedHospital>> {
        validate_coordinates(location)?;
        let hospitals = self.db.list_verified_hospitals().await?;
        Ok(rank_nearest(hospitals, location))
    }

    /// Calls and texts the emergency contact of `user_id`.
    ///
    /// Everything is validated before the first provider call is made.
    pub async fn dispatch(&self, user_id: Uuid, location: Coordinates) -> PortResult<AlertReport> {
        validate_coordinates(location)?;
        let user = self.db.get_user_by_id(user_id).await?;
        let profile = self.db.get_profile_by_user(user_id).await?;
        let recipient = normalize_phone(&profile.emergency_contact_phone, &self.country_code)?;

        let hospitals = self.nearby_hospitals(location).await?;
        let message = compose_alert_message(&user, &profile, location, &hospitals);

        self.notifier
            .place_voice_call(&recipient, &compose_voice_message(&user))
            .await?;
        self.notifier.send_sms(&recipient, &message).await?;

        Ok(AlertReport {
            recipient,
            message,
            hospitals,
        })
    }
}
