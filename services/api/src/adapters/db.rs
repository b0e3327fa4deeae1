//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medvault_core::domain::{
    AccessToken, EmergencyProfile, FoodAllergyScan, Hospital, User, UserCredentials,
};
use medvault_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or(what: impl FnOnce() -> String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => unexpected(e),
    }
}

fn conflict_or(what: impl FnOnce() -> String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| {
        let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
        if duplicate {
            PortError::Conflict(what())
        } else {
            unexpected(e)
        }
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    user_id: Uuid,
    blood_type: String,
    genotype: String,
    weight: f64,
    allergies: String,
    conditions: String,
    medications: String,
    emergency_contact_name: String,
    emergency_contact_phone: String,
    vaccination_history: Json<BTreeMap<String, String>>,
    dietary_restrictions: String,
    smoking_status: String,
    alcohol_consumption: String,
    physical_activity_level: String,
}
impl ProfileRecord {
    fn to_domain(self) -> EmergencyProfile {
        EmergencyProfile {
            id: self.id,
            user_id: self.user_id,
            blood_type: self.blood_type,
            genotype: self.genotype,
            weight: self.weight,
            allergies: self.allergies,
            conditions: self.conditions,
            medications: self.medications,
            emergency_contact_name: self.emergency_contact_name,
            emergency_contact_phone: self.emergency_contact_phone,
            vaccination_history: self.vaccination_history.0,
            dietary_restrictions: self.dietary_restrictions,
            smoking_status: self.smoking_status,
            alcohol_consumption: self.alcohol_consumption,
            physical_activity_level: self.physical_activity_level,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, blood_type, genotype, weight, allergies, conditions, \
     medications, emergency_contact_name, emergency_contact_phone, vaccination_history, \
     dietary_restrictions, smoking_status, alcohol_consumption, physical_activity_level";

#[derive(FromRow)]
struct TokenRecord {
    profile_id: Uuid,
    identifier: Uuid,
    image_svg: String,
    is_active: bool,
    activated_at: Option<DateTime<Utc>>,
}
impl TokenRecord {
    fn to_domain(self) -> AccessToken {
        AccessToken {
            profile_id: self.profile_id,
            identifier: self.identifier,
            image_svg: self.image_svg,
            is_active: self.is_active,
            activated_at: self.activated_at,
        }
    }
}

#[derive(FromRow)]
struct ScanRecord {
    id: Uuid,
    user_id: Uuid,
    food_name: Option<String>,
    food_image: Option<String>,
    detected_allergen: Option<String>,
    confidence: Option<f64>,
    risk_level: Option<String>,
    created_at: DateTime<Utc>,
}
impl ScanRecord {
    fn to_domain(self) -> FoodAllergyScan {
        FoodAllergyScan {
            id: self.id,
            user_id: self.user_id,
            food_name: self.food_name,
            food_image: self.food_image,
            detected_allergen: self.detected_allergen,
            confidence: self.confidence,
            risk_level: self.risk_level,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct HospitalRecord {
    id: Uuid,
    name: String,
    address: String,
    phone: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_verified: bool,
}
impl HospitalRecord {
    fn to_domain(self) -> Hospital {
        Hospital {
            id: self.id,
            name: self.name,
            address: self.address,
            phone: self.phone,
            latitude: self.latitude,
            longitude: self.longitude,
            is_verified: self.is_verified,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, username, email, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, username, email",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or(|| format!("Username '{}' is already taken", username)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, email FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(|| format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, username, hashed_password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(|| format!("User '{}' not found", username)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> PortResult<EmergencyProfile> {
        let sql = format!("SELECT {} FROM emergency_profiles WHERE user_id = $1", PROFILE_COLUMNS);
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or(|| "No emergency profile found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn get_profile_by_id(&self, profile_id: Uuid) -> PortResult<EmergencyProfile> {
        let sql = format!("SELECT {} FROM emergency_profiles WHERE id = $1", PROFILE_COLUMNS);
        let record = sqlx::query_as::<_, ProfileRecord>(&sql)
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or(|| format!("Profile {} not found", profile_id)))?;
        Ok(record.to_domain())
    }

    async fn save_profile(&self, profile: &EmergencyProfile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO emergency_profiles (id, user_id, blood_type, genotype, weight, allergies, \
                 conditions, medications, emergency_contact_name, emergency_contact_phone, \
                 vaccination_history, dietary_restrictions, smoking_status, alcohol_consumption, \
                 physical_activity_level) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (id) DO UPDATE SET \
                 blood_type = EXCLUDED.blood_type, genotype = EXCLUDED.genotype, \
                 weight = EXCLUDED.weight, allergies = EXCLUDED.allergies, \
                 conditions = EXCLUDED.conditions, medications = EXCLUDED.medications, \
                 emergency_contact_name = EXCLUDED.emergency_contact_name, \
                 emergency_contact_phone = EXCLUDED.emergency_contact_phone, \
                 vaccination_history = EXCLUDED.vaccination_history, \
                 dietary_restrictions = EXCLUDED.dietary_restrictions, \
                 smoking_status = EXCLUDED.smoking_status, \
                 alcohol_consumption = EXCLUDED.alcohol_consumption, \
                 physical_activity_level = EXCLUDED.physical_activity_level",
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(&profile.blood_type)
        .bind(&profile.genotype)
        .bind(profile.weight)
        .bind(&profile.allergies)
        .bind(&profile.conditions)
        .bind(&profile.medications)
        .bind(&profile.emergency_contact_name)
        .bind(&profile.emergency_contact_phone)
        .bind(Json(&profile.vaccination_history))
        .bind(&profile.dietary_restrictions)
        .bind(&profile.smoking_status)
        .bind(&profile.alcohol_consumption)
        .bind(&profile.physical_activity_level)
        .execute(&self.pool)
        .await
        .map_err(conflict_or(|| "User already has an emergency profile".to_string()))?;
        Ok(())
    }

    async fn get_token_by_profile(&self, profile_id: Uuid) -> PortResult<AccessToken> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT profile_id, identifier, image_svg, is_active, activated_at \
             FROM access_tokens WHERE profile_id = $1",
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(|| "QR code not found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn get_token_by_identifier(&self, identifier: Uuid) -> PortResult<AccessToken> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT profile_id, identifier, image_svg, is_active, activated_at \
             FROM access_tokens WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(|| "Emergency link not found".to_string()))?;
        Ok(record.to_domain())
    }

    async fn create_token(&self, token: &AccessToken) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO access_tokens (profile_id, identifier, image_svg, is_active, activated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.profile_id)
        .bind(token.identifier)
        .bind(&token.image_svg)
        .bind(token.is_active)
        .bind(token.activated_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_or(|| "Profile already has a QR code".to_string()))?;
        Ok(())
    }

    async fn update_token(&self, token: &AccessToken) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE access_tokens SET is_active = $1, activated_at = $2 WHERE profile_id = $3",
        )
        .bind(token.is_active)
        .bind(token.activated_at)
        .bind(token.profile_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("QR code not found".to_string()));
        }
        Ok(())
    }

    async fn update_token_image(&self, profile_id: Uuid, image_svg: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE access_tokens SET image_svg = $1 WHERE profile_id = $2")
            .bind(image_svg)
            .bind(profile_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound("QR code not found".to_string()));
        }
        Ok(())
    }

    async fn create_scan(&self, scan: &FoodAllergyScan) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO food_allergy_scans (id, user_id, food_name, food_image, detected_allergen, \
                 confidence, risk_level, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(scan.id)
        .bind(scan.user_id)
        .bind(&scan.food_name)
        .bind(&scan.food_image)
        .bind(&scan.detected_allergen)
        .bind(scan.confidence)
        .bind(&scan.risk_level)
        .bind(scan.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn update_scan(&self, scan: &FoodAllergyScan) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE food_allergy_scans SET food_name = $1, detected_allergen = $2, \
                 confidence = $3, risk_level = $4 WHERE id = $5",
        )
        .bind(&scan.food_name)
        .bind(&scan.detected_allergen)
        .bind(scan.confidence)
        .bind(&scan.risk_level)
        .bind(scan.id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Scan {} not found", scan.id)));
        }
        Ok(())
    }

    async fn delete_scan(&self, scan_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM food_allergy_scans WHERE id = $1")
            .bind(scan_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_scans_for_user(&self, user_id: Uuid) -> PortResult<Vec<FoodAllergyScan>> {
        let records = sqlx::query_as::<_, ScanRecord>(
            "SELECT id, user_id, food_name, food_image, detected_allergen, confidence, risk_level, \
                 created_at \
             FROM food_allergy_scans WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_verified_hospitals(&self) -> PortResult<Vec<Hospital>> {
        let records = sqlx::query_as::<_, HospitalRecord>(
            "SELECT id, name, address, phone, latitude, longitude, is_verified \
             FROM hospitals WHERE is_verified AND latitude IS NOT NULL AND longitude IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
