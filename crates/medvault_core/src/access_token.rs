//! crates/medvault_core/src/access_token.rs
//!
//! Lifecycle of the public-access token that backs a profile's QR code.
//!
//! A token moves between inactive and active through explicit owner actions.
//! Expiry is never stored: it is computed from `is_active` and `activated_at`
//! every time the token is read.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{AccessToken, EmergencyProfile};
use crate::ports::{Clock, DatabaseService, PortError, PortResult, QrRenderer};

/// Length of the activation window, in minutes.
pub const ACTIVATION_WINDOW_MINUTES: i64 = 60;

pub fn activation_window() -> Duration {
    Duration::minutes(ACTIVATION_WINDOW_MINUTES)
}

/// Builds the absolute URL a scanner is sent to.
pub fn disclosure_url(base_url: &str, identifier: Uuid) -> String {
    format!("{}/emergency/{}/", base_url.trim_end_matches('/'), identifier)
}

/// The observable state of a token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Inactive,
    Active,
    Expired,
}

impl AccessToken {
    /// A fresh, inactive token for `identifier`.
    pub fn issue(profile_id: Uuid, image_svg: String, identifier: Uuid) -> Self {
        Self {
            profile_id,
            identifier,
            image_svg,
            is_active: false,
            activated_at: None,
        }
    }

    /// Starts (or restarts) the activation window at `now`.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.is_active = true;
        self.activated_at = Some(now);
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.activated_at = None;
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        match (self.is_active, self.activated_at) {
            (true, Some(at)) if now - at > activation_window() => TokenState::Expired,
            (true, Some(_)) => TokenState::Active,
            _ => TokenState::Inactive,
        }
    }

    /// True when the token must not grant access at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) != TokenState::Active
    }

    /// Whole minutes left in the window, or `None` once the token is expired.
    pub fn remaining_minutes_at(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.is_expired_at(now) {
            return None;
        }
        let activated_at = self.activated_at?;
        let elapsed_minutes = (now - activated_at).num_seconds().max(0).div_euclid(60);
        Some(ACTIVATION_WINDOW_MINUTES - elapsed_minutes)
    }
}

/// Token details as seen by its owner.
#[derive(Debug, Clone)]
pub struct TokenStatus {
    pub token: AccessToken,
    pub disclosure_url: String,
    pub is_expired: bool,
    pub remaining_minutes: Option<i64>,
}

/// What an unauthenticated visitor of a disclosure URL is allowed to see.
#[derive(Debug, Clone)]
pub enum Disclosure {
    Inactive,
    Active(EmergencyProfile),
}

//=========================================================================================
// The Lifecycle Manager
//=========================================================================================

/// Issues, activates, deactivates and resolves access tokens.
#[derive(Clone)]
pub struct TokenLifecycle {
    db: Arc<dyn DatabaseService>,
    renderer: Arc<dyn QrRenderer>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl TokenLifecycle {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        renderer: Arc<dyn QrRenderer>,
        clock: Arc<dyn Clock>,
        public_base_url: String,
    ) -> Self {
        Self {
            db,
            renderer,
            clock,
            public_base_url,
        }
    }

    pub fn disclosure_url(&self, identifier: Uuid) -> String {
        disclosure_url(&self.public_base_url, identifier)
    }

    /// Called after every profile save. Creates the token on first save and
    /// re-renders the image of an existing one, keeping its identifier.
    pub async fn issue(&self, profile: &EmergencyProfile) -> PortResult<AccessToken> {
        match self.db.get_token_by_profile(profile.id).await {
            Ok(mut token) => {
                token.image_svg = self.renderer.render(&self.disclosure_url(token.identifier))?;
                // Activation may change concurrently; never write it back from here.
                self.db
                    .update_token_image(token.profile_id, &token.image_svg)
                    .await?;
                Ok(token)
            }
            Err(PortError::NotFound(_)) => {
                let identifier = Uuid::new_v4();
                let image = self.renderer.render(&self.disclosure_url(identifier))?;
                let token = AccessToken::issue(profile.id, image, identifier);
                self.db.create_token(&token).await?;
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn activate(&self, user_id: Uuid) -> PortResult<TokenStatus> {
        let mut token = self.token_for_owner(user_id).await?;
        token.activate(self.clock.now());
        self.db.update_token(&token).await?;
        Ok(self.status_of(token))
    }

    pub async fn deactivate(&self, user_id: Uuid) -> PortResult<TokenStatus> {
        let mut token = self.token_for_owner(user_id).await?;
        token.deactivate();
        self.db.update_token(&token).await?;
        Ok(self.status_of(token))
    }

    pub async fn status(&self, user_id: Uuid) -> PortResult<TokenStatus> {
        let token = self.token_for_owner(user_id).await?;
        Ok(self.status_of(token))
    }

    /// Unauthenticated validity check: not-found for unknown identifiers,
    /// forbidden for expired ones.
    pub async fn public_lookup(&self, identifier: Uuid) -> PortResult<AccessToken> {
        let token = self.db.get_token_by_identifier(identifier).await?;
        if token.is_expired_at(self.clock.now()) {
            return Err(PortError::Forbidden(
                "This emergency link is inactive or has expired".to_string(),
            ));
        }
        Ok(token)
    }

    pub async fn disclose(&self, identifier: Uuid) -> PortResult<Disclosure> {
        let token = self.db.get_token_by_identifier(identifier).await?;
        if token.is_expired_at(self.clock.now()) {
            return Ok(Disclosure::Inactive);
        }
        let profile = self.db.get_profile_by_id(token.profile_id).await?;
        Ok(Disclosure::Active(profile))
    }

    /// Profiles saved before tokens existed get one issued on first access.
    async fn token_for_owner(&self, user_id: Uuid) -> PortResult<AccessToken> {
        let profile = self.db.get_profile_by_user(user_id).await?;
        match self.db.get_token_by_profile(profile.id).await {
            Err(PortError::NotFound(_)) => self.issue(&profile).await,
            other => other,
        }
    }

    fn status_of(&self, token: AccessToken) -> TokenStatus {
        let now = self.clock.now();
        TokenStatus {
            disclosure_url: self.disclosure_url(token.identifier),
            is_expired: token.is_expired_at(now),
            remaining_minutes: token.remaining_minutes_at(now),
            token,
        }
    }
}
