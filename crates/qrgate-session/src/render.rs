//! Renderer seam between the store and the QR image library.

use crate::error::RenderError;
use crate::types::QrImage;

/// Turns a QR payload into a displayable image.
///
/// Implementations are synchronous and may be CPU-heavy; the store always
/// calls them from `spawn_blocking`.
pub trait QrRenderer: Send + Sync + 'static {
    fn render(&self, payload: &str) -> Result<QrImage, RenderError>;
}
