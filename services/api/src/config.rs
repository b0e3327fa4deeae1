//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Provider credentials only ever come from
//! here; no adapter carries a built-in key.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub public_base_url: String,
    pub cors_allowed_origin: String,
    pub session_ttl_days: i64,
    pub openai_api_key: Option<String>,
    pub allergen_model: String,
    pub clarifai_pat: Option<String>,
    pub clarifai_model_url: String,
    pub sms_api_url: String,
    pub voice_api_url: String,
    pub sms_api_key: Option<String>,
    pub sms_sender_id: String,
    pub default_country_code: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PUBLIC_BASE_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }
        let cors_allowed_origin = std::env::var("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        let session_ttl_days = parse_var("SESSION_TTL_DAYS", 30i64)?;
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        // --- Load API Keys (as optional, checked when the adapters are built) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let clarifai_pat = std::env::var("CLARIFAI_PAT").ok();
        let sms_api_key = std::env::var("SMS_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let allergen_model =
            std::env::var("ALLERGEN_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let clarifai_model_url = std::env::var("CLARIFAI_MODEL_URL").unwrap_or_else(|_| {
            "https://api.clarifai.com/v2/users/clarifai/apps/main/models/food-item-recognition/outputs"
                .to_string()
        });
        let sms_api_url = std::env::var("SMS_API_URL")
            .unwrap_or_else(|_| "https://api.ng.termii.com/api/sms/send".to_string());
        let voice_api_url = std::env::var("VOICE_API_URL")
            .unwrap_or_else(|_| "https://api.ng.termii.com/api/sms/otp/send/voice".to_string());
        let sms_sender_id =
            std::env::var("SMS_SENDER_ID").unwrap_or_else(|_| "MedVault".to_string());
        let default_country_code =
            std::env::var("DEFAULT_COUNTRY_CODE").unwrap_or_else(|_| "234".to_string());
        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_COUNTRY_CODE".to_string(),
                format!("'{}' is not a numeric country code", default_country_code),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            public_base_url,
            cors_allowed_origin,
            session_ttl_days,
            openai_api_key,
            allergen_model,
            clarifai_pat,
            clarifai_model_url,
            sms_api_url,
            voice_api_url,
            sms_api_key,
            sms_sender_id,
            default_country_code,
        })
    }

    /// A configuration suitable for tests and local experiments.
    pub fn for_local(public_base_url: &str) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database_url: None,
            database_max_connections: 1,
            log_level: Level::DEBUG,
            public_base_url: public_base_url.to_string(),
            cors_allowed_origin: "http://localhost:8081".to_string(),
            session_ttl_days: 30,
            openai_api_key: None,
            allergen_model: "gpt-4o-mini".to_string(),
            clarifai_pat: None,
            clarifai_model_url: String::new(),
            sms_api_url: String::new(),
            voice_api_url: String::new(),
            sms_api_key: None,
            sms_sender_id: "MedVault".to_string(),
            default_country_code: "234".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
