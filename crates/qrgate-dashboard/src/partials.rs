//! HTMX partial endpoints.
//!
//! These return HTML fragments (not full pages) that HTMX swaps in place
//! of the QR card.

use askama::Template;
use axum::extract::State;
use axum::response::Html;

use crate::pages::POLL_SECS;
use crate::views::QrCardView;
use crate::{DashboardState, render};

#[derive(Template)]
#[template(path = "_partials/qr_card.html")]
pub(crate) struct QrCardPartial {
    pub card: QrCardView,
    pub poll_secs: u32,
}

impl QrCardPartial {
    pub(crate) async fn load(state: &DashboardState) -> Self {
        let (status, image) = state.store.snapshot().await;
        Self {
            card: QrCardView::build(&status, image),
            poll_secs: POLL_SECS,
        }
    }
}

pub async fn qr_card(State(state): State<DashboardState>) -> Html<String> {
    render(QrCardPartial::load(&state).await)
}
