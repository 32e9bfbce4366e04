//! Domain types for the pairing session.
//!
//! `SessionState` is the single source of truth; everything callers see
//! (`SessionStatus`, `QrImageLookup`) is derived from it on read.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::RenderError;

// ── Image ──────────────────────────────────────────────────────────

/// A rendered QR code. The store never looks inside `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    /// MIME type of `bytes`, e.g. `image/svg+xml`.
    pub content_type: &'static str,
    pub bytes: Bytes,
}

impl QrImage {
    pub fn new(content_type: &'static str, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Encode as a `data:` URI suitable for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Render progress for the payload currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Pending,
    Ready(QrImage),
    /// Rendering failed; the payload stays available without an image.
    Failed(String),
}

// ── State ──────────────────────────────────────────────────────────

/// A QR payload waiting to be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQr {
    pub payload: String,
    /// Bumped on every accepted payload; tags render results.
    pub generation: u64,
    /// Monotonic receive time, used for freshness.
    pub received_at: Instant,
    /// Wall-clock receive time (unix seconds), used for display.
    pub received_unix: u64,
    pub image: ImageSlot,
}

impl PendingQr {
    /// Whether the payload is still inside the freshness window at `now`.
    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.received_at) < window
    }
}

/// The pairing state machine.
///
/// Being an enum, the contradictory combinations a set of flags would allow
/// (connected with a leftover payload, scanning without one) cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingScan(PendingQr),
    Connected {
        since_unix: u64,
    },
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::AwaitingScan(_) => Phase::AwaitingScan,
            SessionState::Connected { .. } => Phase::Connected,
        }
    }

    /// Build the externally visible snapshot of this state.
    pub fn status(&self, now: Instant, freshness_window: Duration) -> SessionStatus {
        match self {
            SessionState::Idle => SessionStatus {
                phase: Phase::Idle,
                connected: false,
                qr_available: false,
                fresh: false,
                scanning: false,
                render: RenderState::None,
                received_at: None,
                connected_since: None,
            },
            SessionState::AwaitingScan(qr) => SessionStatus {
                phase: Phase::AwaitingScan,
                connected: false,
                qr_available: true,
                fresh: qr.is_fresh(now, freshness_window),
                scanning: true,
                render: RenderState::from(&qr.image),
                received_at: Some(qr.received_unix),
                connected_since: None,
            },
            SessionState::Connected { since_unix } => SessionStatus {
                phase: Phase::Connected,
                connected: true,
                qr_available: false,
                fresh: false,
                scanning: false,
                render: RenderState::None,
                received_at: None,
                connected_since: Some(*since_unix),
            },
        }
    }

    pub fn qr_image(&self) -> QrImageLookup {
        match self {
            SessionState::AwaitingScan(qr) => match &qr.image {
                ImageSlot::Ready(image) => QrImageLookup::Ready(image.clone()),
                ImageSlot::Pending => QrImageLookup::Pending,
                ImageSlot::Failed(_) => QrImageLookup::Unrenderable,
            },
            SessionState::Idle | SessionState::Connected { .. } => QrImageLookup::NoQr,
        }
    }
}

/// Macro-state of the session, without payload detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingScan,
    Connected,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingScan => "awaiting_scan",
            Phase::Connected => "connected",
        }
    }
}

// ── Read models ────────────────────────────────────────────────────

/// Render progress as reported in status snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    /// No payload in flight.
    None,
    Pending,
    Ready,
    Failed,
}

impl From<&ImageSlot> for RenderState {
    fn from(slot: &ImageSlot) -> Self {
        match slot {
            ImageSlot::Pending => RenderState::Pending,
            ImageSlot::Ready(_) => RenderState::Ready,
            ImageSlot::Failed(_) => RenderState::Failed,
        }
    }
}

/// Point-in-time view of the session, as served to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub connected: bool,
    pub qr_available: bool,
    /// Payload present, not connected, and received within the window.
    pub fresh: bool,
    pub scanning: bool,
    pub render: RenderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_since: Option<u64>,
}

/// Result of asking for the current QR image.
///
/// Absence is a normal answer, split by cause so callers can tell
/// "still rendering" from "nothing to render".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImageLookup {
    Ready(QrImage),
    /// A payload is in flight but its render has not landed yet.
    Pending,
    /// A payload is in flight but could not be rendered.
    Unrenderable,
    /// No payload in flight (idle or connected).
    NoQr,
}

impl QrImageLookup {
    pub fn into_image(self) -> Option<QrImage> {
        match self {
            QrImageLookup::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QrImageLookup::Ready(_))
    }
}

/// How the render step of a `receive_qr` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The image for this payload is available.
    Rendered,
    /// Rendering outlived the response budget; it completes in the background.
    RenderPending,
    /// A newer payload (or a connect/reset) replaced this one before its
    /// image landed.
    Superseded,
    /// The payload is recorded but has no image.
    RenderFailed(RenderError),
}

impl ReceiveOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReceiveOutcome::Rendered => "rendered",
            ReceiveOutcome::RenderPending => "pending",
            ReceiveOutcome::Superseded => "superseded",
            ReceiveOutcome::RenderFailed(_) => "failed",
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
