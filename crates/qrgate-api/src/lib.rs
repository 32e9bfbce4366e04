//! qrgate-api: REST API for qrgate.
//!
//! Exposes the session store to the bot (writers) and to pollers
//! (readers). Mounts the dashboard at `/`.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/qr` | Submit a QR payload (`{"qr": "..."}`) |
//! | GET | `/api/qr` | Raw payload in flight (204 when none) |
//! | GET | `/api/qr/image` | Rendered QR image |
//! | GET | `/api/status` | Session status snapshot |
//! | POST | `/api/connected` | Mark the bot connected |
//! | POST | `/api/reset` | Return the session to idle |
//! | GET | `/healthz` | Liveness (keep-alive target) |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use qrgate_session::SessionStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: SessionStore,
}

/// Build the complete router (REST + dashboard + health).
pub fn build_router(store: SessionStore) -> Router {
    let api_state = ApiState {
        store: store.clone(),
    };

    let dashboard_state = qrgate_dashboard::DashboardState { store };

    let api_routes = Router::new()
        .route("/qr", get(handlers::get_qr).post(handlers::submit_qr))
        .route("/qr/image", get(handlers::get_qr_image))
        .route("/status", get(handlers::get_status))
        .route("/connected", post(handlers::mark_connected))
        .route("/reset", post(handlers::reset_session))
        .with_state(api_state);

    Router::new()
        .nest("/api", api_routes)
        .route("/healthz", get(handlers::healthz))
        .merge(qrgate_dashboard::dashboard_router(dashboard_state))
}
