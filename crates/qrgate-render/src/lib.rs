//! qrgate-render: turns pairing payloads into scannable images.
//!
//! Implements [`qrgate_session::QrRenderer`] on top of the `qrcode` crate's
//! SVG backend. SVG keeps the output small, needs no raster codec, and
//! scales cleanly on phone screens held up to a monitor.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use tracing::trace;

use qrgate_session::{QrImage, QrRenderer, RenderError};

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Visual options for [`SvgQrRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgOptions {
    /// Minimum width/height of the whole image in pixels.
    pub min_size: u32,
    pub quiet_zone: bool,
    pub dark_color: String,
    pub light_color: String,
    pub ec_level: EcLevel,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            min_size: 264,
            quiet_zone: true,
            dark_color: "#000000".to_string(),
            light_color: "#ffffff".to_string(),
            ec_level: EcLevel::M,
        }
    }
}

/// Renders QR payloads as standalone SVG documents.
#[derive(Debug, Clone, Default)]
pub struct SvgQrRenderer {
    options: SvgOptions,
}

impl SvgQrRenderer {
    pub fn new(options: SvgOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SvgOptions {
        &self.options
    }

    /// Render straight to an SVG string.
    pub fn render_svg(&self, payload: &str) -> Result<String, RenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), self.options.ec_level)
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        trace!(version = ?code.version(), width = code.width(), "qr encoded");

        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(self.options.min_size, self.options.min_size)
            .quiet_zone(self.options.quiet_zone)
            .dark_color(svg::Color(&self.options.dark_color))
            .light_color(svg::Color(&self.options.light_color))
            .build())
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, payload: &str) -> Result<QrImage, RenderError> {
        let svg = self.render_svg(payload)?;
        Ok(QrImage::new(SVG_CONTENT_TYPE, svg))
    }
}
