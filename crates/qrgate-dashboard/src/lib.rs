//! qrgate-dashboard: server-rendered pairing page.
//!
//! Renders the page a human opens to scan the bot's QR code. The QR card
//! is an HTMX partial that re-polls itself, so a rotated QR or a finished
//! pairing shows up without a reload.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | Full pairing page |
//! | `GET /partials/qr` | QR card fragment (polled every 3s) |
//! | `POST /actions/reset` | Reset the session, return a fresh card |

pub mod actions;
pub mod pages;
pub mod partials;
pub mod views;

use askama::Template;
use axum::Router;
use axum::response::Html;
use axum::routing::{get, post};
use qrgate_session::SessionStore;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub store: SessionStore,
}

/// Build the dashboard router.
pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/partials/qr", get(partials::qr_card))
        .route("/actions/reset", post(actions::reset))
        .with_state(state)
}

pub(crate) fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        format!("<pre>Template error: {e}</pre>")
    }))
}
