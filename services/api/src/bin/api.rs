//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, FoodClassifierAdapter, HttpNotificationAdapter, InflectorSingularizer,
        MemoryDbAdapter, SvgQrRenderer,
    },
    config::Config,
    error::ApiError,
    web::{
        self,
        state::{Adapters, AppState},
    },
};
use async_openai::{config::OpenAIConfig, Client};
use medvault_core::ports::{Clock, DatabaseService, SystemClock};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn required(value: &Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Internal(format!("{} is required", name)))
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; data will be kept in memory only.");
            Arc::new(MemoryDbAdapter::new(clock.clone()))
        }
    };

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let openai_config =
        OpenAIConfig::new().with_api_key(required(&config.openai_api_key, "OPENAI_API_KEY")?);
    let openai_client = Client::with_config(openai_config);

    let classifier = Arc::new(FoodClassifierAdapter::new(
        http.clone(),
        config.clarifai_model_url.clone(),
        required(&config.clarifai_pat, "CLARIFAI_PAT")?,
        openai_client,
        config.allergen_model.clone(),
    ));
    let notifier = Arc::new(HttpNotificationAdapter::new(
        http,
        config.sms_api_url.clone(),
        config.voice_api_url.clone(),
        required(&config.sms_api_key, "SMS_API_KEY")?,
        config.sms_sender_id.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Adapters {
            db,
            classifier,
            notifier,
            qr_renderer: Arc::new(SvgQrRenderer),
            singularizer: Arc::new(InflectorSingularizer),
            clock,
        },
    ));

    // --- 5. Create the Web Router ---
    let app = web::router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
