pub mod alert;
pub mod auth;
pub mod disclosure;
pub mod middleware;
pub mod rest;
pub mod scan;
pub mod state;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::web::{middleware::require_auth, rest::ApiDoc, state::AppState};

/// Builds the complete application router, Swagger UI included.
pub fn router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = HeaderValue::from_str(&app_state.config.cors_allowed_origin).map_err(|e| {
        ApiError::Internal(format!(
            "Invalid CORS origin '{}': {}",
            app_state.config.cors_allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/api/emergency/{token}/status", get(token::token_status_handler))
        .route("/emergency/{token}/", get(disclosure::disclosure_page_handler))
        .route("/emergency/{token}", get(disclosure::disclosure_page_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/emergency-profile",
            get(rest::get_profile_handler).post(rest::save_profile_handler),
        )
        .route("/api/qrcode", get(token::get_qrcode_handler))
        .route("/api/qrcode/activate", post(token::activate_qrcode_handler))
        .route("/api/qrcode/deactivate", post(token::deactivate_qrcode_handler))
        .route("/api/scan-food", post(scan::scan_food_handler))
        .route("/api/scan-history", get(scan::scan_history_handler))
        .route("/api/send-message", post(alert::send_alert_handler))
        .route("/api/hospitals/nearby", get(alert::nearby_hospitals_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
