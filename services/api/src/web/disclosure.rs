//! services/api/src/web/disclosure.rs
//!
//! The public page a responder reaches by scanning a QR code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use medvault_core::domain::EmergencyProfile;
use medvault_core::ports::PortError;
use medvault_core::Disclosure;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info};

use crate::web::state::AppState;
use crate::web::token::parse_identifier;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        body = body
    )
}

fn row(out: &mut String, label: &str, value: &str) {
    let value = if value.trim().is_empty() { "None recorded" } else { value };
    let _ = writeln!(
        out,
        "<tr><th>{}</th><td>{}</td></tr>",
        escape_html(label),
        escape_html(value)
    );
}

pub fn render_profile_page(profile: &EmergencyProfile) -> String {
    let mut body = String::from("<h1>Emergency Medical Profile</h1>\n<table>\n");
    row(&mut body, "Blood type", &profile.blood_type);
    row(&mut body, "Genotype", &profile.genotype);
    row(&mut body, "Weight (kg)", &profile.weight.to_string());
    row(&mut body, "Allergies", &profile.allergies);
    row(&mut body, "Conditions", &profile.conditions);
    row(&mut body, "Medications", &profile.medications);
    row(&mut body, "Emergency contact", &profile.emergency_contact_name);
    row(&mut body, "Emergency contact phone", &profile.emergency_contact_phone);
    row(&mut body, "Dietary restrictions", &profile.dietary_restrictions);
    row(&mut body, "Smoking status", &profile.smoking_status);
    row(&mut body, "Alcohol consumption", &profile.alcohol_consumption);
    row(&mut body, "Physical activity", &profile.physical_activity_level);
    body.push_str("</table>\n");

    if !profile.vaccination_history.is_empty() {
        body.push_str("<h2>Vaccinations</h2>\n<ul>\n");
        for (vaccine, date) in &profile.vaccination_history {
            let _ = writeln!(body, "<li>{}: {}</li>", escape_html(vaccine), escape_html(date));
        }
        body.push_str("</ul>\n");
    }
    page("Emergency Medical Profile", &body)
}

pub fn render_inactive_page() -> String {
    page(
        "Emergency Profile Unavailable",
        "<h1>Emergency Profile Unavailable</h1>\n\
         <p>This emergency link is inactive or has expired. Ask the owner to activate their QR code.</p>\n",
    )
}

fn render_not_found_page() -> String {
    page(
        "Not Found",
        "<h1>Not Found</h1>\n<p>This emergency link does not exist.</p>\n",
    )
}

/// GET /emergency/{token}/
pub async fn disclosure_page_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    let identifier = match parse_identifier(&token) {
        Ok(id) => id,
        Err(_) => return (StatusCode::NOT_FOUND, Html(render_not_found_page())).into_response(),
    };

    match state.tokens.disclose(identifier).await {
        Ok(Disclosure::Active(profile)) => {
            info!("Disclosed emergency profile {}", profile.id);
            (StatusCode::OK, Html(render_profile_page(&profile))).into_response()
        }
        Ok(Disclosure::Inactive) => {
            (StatusCode::FORBIDDEN, Html(render_inactive_page())).into_response()
        }
        Err(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(render_not_found_page())).into_response()
        }
        Err(e) => {
            error!("Failed to resolve emergency link {}: {:?}", identifier, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page("Error", "<h1>Something went wrong</h1>\n")),
            )
                .into_response()
        }
    }
}
