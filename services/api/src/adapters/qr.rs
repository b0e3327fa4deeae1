//! services/api/src/adapters/qr.rs
//!
//! Renders disclosure URLs as SVG QR codes. Implements the `QrRenderer` port.

use medvault_core::ports::{PortError, PortResult, QrRenderer};
use qrcode::render::svg;
use qrcode::QrCode;

/// A `QrRenderer` producing dark-on-white SVG markup.
#[derive(Clone, Debug, Default)]
pub struct SvgQrRenderer;

impl QrRenderer for SvgQrRenderer {
    fn render(&self, url: &str) -> PortResult<String> {
        let code = QrCode::new(url.as_bytes())
            .map_err(|e| PortError::Unexpected(format!("QR generation failed: {e}")))?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(200, 200)
            .max_dimensions(300, 300)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .quiet_zone(true)
            .build())
    }
}
