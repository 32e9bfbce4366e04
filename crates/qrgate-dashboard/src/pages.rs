//! Full-page handlers.

use askama::Template;
use axum::extract::State;
use axum::response::Html;

use crate::views::QrCardView;
use crate::{DashboardState, render};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    card: QrCardView,
    poll_secs: u32,
}

/// Seconds between HTMX refreshes of the QR card.
pub const POLL_SECS: u32 = 3;

pub async fn index(State(state): State<DashboardState>) -> Html<String> {
    let (status, image) = state.store.snapshot().await;
    render(IndexTemplate {
        card: QrCardView::build(&status, image),
        poll_secs: POLL_SECS,
    })
}
