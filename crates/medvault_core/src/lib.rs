pub mod access_token;
pub mod alert;
pub mod allergen;
pub mod domain;
pub mod hospitals;
pub mod ports;
pub mod profile;

pub use access_token::{Disclosure, TokenLifecycle, TokenState, TokenStatus};
pub use alert::{AlertReport, EmergencyAlerter};
pub use allergen::{AllergenEvaluator, RiskOutcome, RiskTier, ScanRequest};
pub use domain::{
    AccessToken, AuthSession, Classification, Coordinates, EmergencyProfile, FoodAllergyScan,
    Hospital, ProfileUpdate, RankedHospital, User, UserCredentials,
};
pub use ports::{
    ClassificationService, Clock, DatabaseService, NotificationService, PortError, PortResult,
    QrRenderer, Singularizer, SystemClock,
};
