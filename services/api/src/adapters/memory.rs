//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Used when no
//! `DATABASE_URL` is configured and by the integration tests. It enforces the
//! same uniqueness and ownership rules as the Postgres schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medvault_core::domain::{
    AccessToken, AuthSession, EmergencyProfile, FoodAllergyScan, Hospital, User, UserCredentials,
};
use medvault_core::ports::{Clock, DatabaseService, PortError, PortResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, (User, String)>,
    sessions: HashMap<String, AuthSession>,
    profiles: HashMap<Uuid, EmergencyProfile>,
    /// Keyed by profile id.
    tokens: HashMap<Uuid, AccessToken>,
    scans: HashMap<Uuid, FoodAllergyScan>,
    hospitals: Vec<Hospital>,
}

/// A `DatabaseService` backed by hash maps behind a single lock.
#[derive(Clone)]
pub struct MemoryDbAdapter {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryDbAdapter {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryDbAdapter {
    /// `clock` decides when auth sessions expire.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock,
        }
    }

    /// Adds a hospital to the directory.
    pub async fn insert_hospital(&self, hospital: Hospital) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if tables.hospitals.iter().any(|h| h.name == hospital.name) {
            return Err(PortError::Conflict(format!(
                "Hospital '{}' is already registered",
                hospital.name
            )));
        }
        tables.hospitals.push(hospital);
        Ok(())
    }

    /// Number of stored scans across all users.
    pub async fn scan_count(&self) -> usize {
        self.tables.read().await.scans.len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|(u, _)| u.username == username) {
            return Err(PortError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
        };
        tables
            .users
            .insert(user.user_id, (user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables
            .read()
            .await
            .users
            .get(&user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| UserCredentials {
                user_id: u.user_id,
                username: u.username.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User '{}' not found", username)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        tables.sessions.retain(|_, s| s.expires_at > now);
        tables.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let now = self.clock.now();
        let mut tables = self.tables.write().await;
        match tables.sessions.get(session_id) {
            Some(session) if session.expires_at > now => Ok(session.user_id),
            Some(_) => {
                tables.sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn get_profile_by_user(&self, user_id: Uuid) -> PortResult<EmergencyProfile> {
        self.tables
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("No emergency profile found".to_string()))
    }

    async fn get_profile_by_id(&self, profile_id: Uuid) -> PortResult<EmergencyProfile> {
        self.tables
            .read()
            .await
            .profiles
            .get(&profile_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", profile_id)))
    }

    async fn save_profile(&self, profile: &EmergencyProfile) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .profiles
            .values()
            .any(|p| p.user_id == profile.user_id && p.id != profile.id);
        if taken {
            return Err(PortError::Conflict(
                "User already has an emergency profile".to_string(),
            ));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_token_by_profile(&self, profile_id: Uuid) -> PortResult<AccessToken> {
        self.tables
            .read()
            .await
            .tokens
            .get(&profile_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("QR code not found".to_string()))
    }

    async fn get_token_by_identifier(&self, identifier: Uuid) -> PortResult<AccessToken> {
        self.tables
            .read()
            .await
            .tokens
            .values()
            .find(|t| t.identifier == identifier)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Emergency link not found".to_string()))
    }

    async fn create_token(&self, token: &AccessToken) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.profiles.contains_key(&token.profile_id) {
            return Err(PortError::NotFound(format!(
                "Profile {} not found",
                token.profile_id
            )));
        }
        let duplicate = tables.tokens.contains_key(&token.profile_id)
            || tables.tokens.values().any(|t| t.identifier == token.identifier);
        if duplicate {
            return Err(PortError::Conflict("Profile already has a QR code".to_string()));
        }
        tables.tokens.insert(token.profile_id, token.clone());
        Ok(())
    }

    async fn update_token(&self, token: &AccessToken) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .tokens
            .get_mut(&token.profile_id)
            .ok_or_else(|| PortError::NotFound("QR code not found".to_string()))?;
        // The identifier is immutable once issued.
        stored.is_active = token.is_active;
        stored.activated_at = token.activated_at;
        Ok(())
    }

    async fn update_token_image(&self, profile_id: Uuid, image_svg: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .tokens
            .get_mut(&profile_id)
            .ok_or_else(|| PortError::NotFound("QR code not found".to_string()))?;
        stored.image_svg = image_svg.to_string();
        Ok(())
    }

    async fn create_scan(&self, scan: &FoodAllergyScan) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&scan.user_id) {
            return Err(PortError::NotFound(format!("User {} not found", scan.user_id)));
        }
        tables.scans.insert(scan.id, scan.clone());
        Ok(())
    }

    async fn update_scan(&self, scan: &FoodAllergyScan) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .scans
            .get_mut(&scan.id)
            .ok_or_else(|| PortError::NotFound(format!("Scan {} not found", scan.id)))?;
        stored.food_name = scan.food_name.clone();
        stored.detected_allergen = scan.detected_allergen.clone();
        stored.confidence = scan.confidence;
        stored.risk_level = scan.risk_level.clone();
        Ok(())
    }

    async fn delete_scan(&self, scan_id: Uuid) -> PortResult<()> {
        self.tables.write().await.scans.remove(&scan_id);
        Ok(())
    }

    async fn list_scans_for_user(&self, user_id: Uuid) -> PortResult<Vec<FoodAllergyScan>> {
        let tables = self.tables.read().await;
        let mut scans: Vec<_> = tables
            .scans
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scans)
    }

    async fn list_verified_hospitals(&self) -> PortResult<Vec<Hospital>> {
        Ok(self
            .tables
            .read()
            .await
            .hospitals
            .iter()
            .filter(|h| h.is_verified && h.latitude.is_some() && h.longitude.is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    async fn user(db: &MemoryDbAdapter, name: &str) -> User {
        db.create_user(name, &format!("{}@example.com", name), "hash")
            .await
            .unwrap()
    }

    fn profile_for(user_id: Uuid) -> EmergencyProfile {
        EmergencyProfile {
            id: Uuid::new_v4(),
            user_id,
            blood_type: "A+".to_string(),
            genotype: "AA".to_string(),
            weight: 60.0,
            allergies: String::new(),
            conditions: String::new(),
            medications: String::new(),
            emergency_contact_name: "Ngozi".to_string(),
            emergency_contact_phone: "08030000000".to_string(),
            vaccination_history: BTreeMap::new(),
            dietary_restrictions: String::new(),
            smoking_status: String::new(),
            alcohol_consumption: String::new(),
            physical_activity_level: String::new(),
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = MemoryDbAdapter::default();
        user(&db, "amaka").await;
        let again = db.create_user("amaka", "other@example.com", "hash").await;
        assert!(matches!(again, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn one_profile_per_user() {
        let db = MemoryDbAdapter::default();
        let owner = user(&db, "bayo").await;
        db.save_profile(&profile_for(owner.user_id)).await.unwrap();
        let second = db.save_profile(&profile_for(owner.user_id)).await;
        assert!(matches!(second, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn token_update_keeps_identifier() {
        let db = MemoryDbAdapter::default();
        let owner = user(&db, "chidi").await;
        let profile = profile_for(owner.user_id);
        db.save_profile(&profile).await.unwrap();

        let original = AccessToken::issue(profile.id, "<svg/>".to_string(), Uuid::new_v4());
        db.create_token(&original).await.unwrap();

        let mut changed = original.clone();
        changed.identifier = Uuid::new_v4();
        changed.is_active = true;
        db.update_token(&changed).await.unwrap();

        let stored = db.get_token_by_profile(profile.id).await.unwrap();
        assert_eq!(stored.identifier, original.identifier);
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn image_refresh_does_not_touch_activation() {
        let db = MemoryDbAdapter::default();
        let owner = user(&db, "emeka").await;
        let profile = profile_for(owner.user_id);
        db.save_profile(&profile).await.unwrap();

        let issued = AccessToken::issue(profile.id, "<svg/>".to_string(), Uuid::new_v4());
        db.create_token(&issued).await.unwrap();
        // A profile save read the token before the owner activated it.
        let stale = db.get_token_by_profile(profile.id).await.unwrap();

        let mut activated = stale.clone();
        activated.activate(Utc::now());
        db.update_token(&activated).await.unwrap();
        db.update_token_image(stale.profile_id, "<svg>new</svg>")
            .await
            .unwrap();

        let stored = db.get_token_by_profile(profile.id).await.unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.activated_at, activated.activated_at);
        assert_eq!(stored.image_svg, "<svg>new</svg>");
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned() {
        let db = MemoryDbAdapter::default();
        let owner = user(&db, "fola").await;
        let past = Utc::now() - chrono::Duration::minutes(1);
        let future = Utc::now() + chrono::Duration::days(1);

        db.create_auth_session("old", owner.user_id, past).await.unwrap();
        assert!(matches!(
            db.validate_auth_session("old").await,
            Err(PortError::Unauthorized)
        ));
        assert!(!db.tables.read().await.sessions.contains_key("old"));

        db.create_auth_session("stale", owner.user_id, past).await.unwrap();
        db.create_auth_session("fresh", owner.user_id, future).await.unwrap();
        let tables = db.tables.read().await;
        assert!(!tables.sessions.contains_key("stale"));
        assert!(tables.sessions.contains_key("fresh"));
    }

    #[tokio::test]
    async fn scans_listed_newest_first() {
        let db = MemoryDbAdapter::default();
        let owner = user(&db, "dayo").await;
        let base = Utc::now();
        for offset in [0, 2, 1] {
            let scan = FoodAllergyScan {
                id: Uuid::new_v4(),
                user_id: owner.user_id,
                food_name: Some(format!("meal {}", offset)),
                food_image: None,
                detected_allergen: None,
                confidence: None,
                risk_level: None,
                created_at: base + chrono::Duration::seconds(offset),
            };
            db.create_scan(&scan).await.unwrap();
        }
        let names: Vec<_> = db
            .list_scans_for_user(owner.user_id)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|s| s.food_name)
            .collect();
        assert_eq!(names, ["meal 2", "meal 1", "meal 0"]);
    }
}
