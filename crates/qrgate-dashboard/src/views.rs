//! View types for dashboard template rendering.
//!
//! Pre-formatted strings and flat state tags, so templates only branch
//! on string equality.

use chrono::DateTime;
use qrgate_session::{QrImageLookup, SessionStatus};

/// Everything the QR card needs to draw itself.
pub struct QrCardView {
    /// One of `connected`, `ready`, `pending`, `failed`, `empty`.
    pub state: &'static str,
    pub badge: &'static str,
    pub badge_class: &'static str,
    /// `data:` URL of the rendered QR when `state == "ready"`.
    pub image_src: Option<String>,
    pub fresh: bool,
    pub received_display: Option<String>,
    pub connected_display: Option<String>,
}

impl QrCardView {
    pub fn build(status: &SessionStatus, image: QrImageLookup) -> Self {
        let (state, image_src) = if status.connected {
            ("connected", None)
        } else {
            match image {
                QrImageLookup::Ready(image) => ("ready", Some(image.to_data_url())),
                QrImageLookup::Pending => ("pending", None),
                QrImageLookup::Unrenderable => ("failed", None),
                QrImageLookup::NoQr => ("empty", None),
            }
        };

        let (badge, badge_class) = if status.connected {
            ("Connected", "badge-ok")
        } else if status.scanning && status.fresh {
            ("Waiting for scan", "badge-wait")
        } else if status.scanning {
            ("QR expired", "badge-warn")
        } else {
            ("Idle", "badge-idle")
        };

        Self {
            state,
            badge,
            badge_class,
            image_src,
            fresh: status.fresh,
            received_display: status.received_at.map(format_timestamp),
            connected_display: status.connected_since.map(format_timestamp),
        }
    }
}

/// Format unix seconds as `HH:MM:SS UTC`.
pub fn format_timestamp(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|dt| dt.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
