//! Dashboard action endpoints.
//!
//! HTMX form handlers that mutate the session and return the refreshed
//! QR card.

use axum::extract::State;
use axum::response::Html;
use tracing::info;

use crate::partials::QrCardPartial;
use crate::{DashboardState, render};

/// POST /actions/reset
///
/// Clears the session so the page waits for the bot's next QR. Restarting
/// the bot itself is up to whoever operates it.
pub async fn reset(State(state): State<DashboardState>) -> Html<String> {
    let previous = state.store.reset().await;
    info!(from = previous.as_str(), "session reset from dashboard");
    render(QrCardPartial::load(&state).await)
}
