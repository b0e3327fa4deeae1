//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use medvault_core::ports::{
    ClassificationService, Clock, DatabaseService, NotificationService, QrRenderer, Singularizer,
};
use medvault_core::{AllergenEvaluator, EmergencyAlerter, TokenLifecycle};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub tokens: TokenLifecycle,
    pub allergens: AllergenEvaluator,
    pub alerts: EmergencyAlerter,
}

/// The external collaborators the application is wired against.
pub struct Adapters {
    pub db: Arc<dyn DatabaseService>,
    pub classifier: Arc<dyn ClassificationService>,
    pub notifier: Arc<dyn NotificationService>,
    pub qr_renderer: Arc<dyn QrRenderer>,
    pub singularizer: Arc<dyn Singularizer>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the core services on top of the given adapters.
    pub fn new(config: Arc<Config>, adapters: Adapters) -> Self {
        let Adapters {
            db,
            classifier,
            notifier,
            qr_renderer,
            singularizer,
            clock,
        } = adapters;

        let tokens = TokenLifecycle::new(
            db.clone(),
            qr_renderer,
            clock.clone(),
            config.public_base_url.clone(),
        );
        let allergens =
            AllergenEvaluator::new(db.clone(), classifier, singularizer, clock.clone());
        let alerts = EmergencyAlerter::new(
            db.clone(),
            notifier,
            config.default_country_code.clone(),
        );

        Self {
            db,
            config,
            clock,
            tokens,
            allergens,
            alerts,
        }
    }
}
