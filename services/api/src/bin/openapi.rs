//! services/api/src/bin/openapi.rs
//!
//! Writes the MedVault OpenAPI document to disk so the mobile client can
//! generate its bindings without running the server.
//!
//! Usage: `openapi [OUTPUT_PATH]` (defaults to `openapi.json`).

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi();
    let operations = document.paths.paths.len();
    std::fs::write(path, document.to_pretty_json()?)?;
    Ok(operations)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let paths = write_document(&path)?;
    println!("Wrote {} API paths to {}", paths, path);
    Ok(())
}
