//! REST API handlers.
//!
//! Each handler calls one `SessionStore` operation and returns JSON,
//! except the image endpoint which returns the image body itself.

use axum::extract::{FromRequest, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use qrgate_session::{QrImageLookup, ReceiveOutcome};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── QR ─────────────────────────────────────────────────────────

/// Receipt returned to the bot after a QR submission.
#[derive(serde::Serialize)]
pub struct QrReceipt {
    pub message: &'static str,
    /// `rendered`, `pending`, `superseded` or `failed`.
    pub render: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_error: Option<String>,
}

#[derive(Deserialize)]
struct QrForm {
    qr: Option<String>,
}

/// Extract `qr` from a urlencoded form or, for any other content type,
/// a JSON object. Malformed bodies are answered with axum's rejection.
async fn qr_field(request: Request) -> Result<Option<String>, Response> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<QrForm>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(form.qr)
    } else {
        let Json(body) = Json::<Value>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(body.get("qr").and_then(Value::as_str).map(str::to_string))
    }
}

/// POST /api/qr
///
/// Body: `{"qr": "<payload>"}` or the form `qr=<payload>`. A missing,
/// empty or non-string `qr` is rejected with 400 before the session is
/// touched.
pub async fn submit_qr(State(state): State<ApiState>, request: Request) -> Response {
    let payload = match qr_field(request).await {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    match state.store.receive_qr(payload.as_deref()).await {
        Ok(outcome) => {
            let render_error = match &outcome {
                ReceiveOutcome::RenderFailed(e) => Some(e.to_string()),
                _ => None,
            };
            ApiResponse::ok(QrReceipt {
                message: "qr received",
                render: outcome.label(),
                render_error,
            })
            .into_response()
        }
        Err(e) => {
            debug!(error = %e, "rejected qr submission");
            error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
        }
    }
}

/// GET /api/qr
pub async fn get_qr(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.current_payload().await {
        Some(qr) => ApiResponse::ok(serde_json::json!({ "qr": qr })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /api/qr/image
pub async fn get_qr_image(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.qr_image().await {
        QrImageLookup::Ready(image) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, "no-store"),
            ],
            image.bytes,
        )
            .into_response(),
        QrImageLookup::Pending => (
            StatusCode::ACCEPTED,
            ApiResponse::ok(serde_json::json!({ "render": "pending" })),
        )
            .into_response(),
        QrImageLookup::Unrenderable => {
            error_response("qr code could not be rendered", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
        QrImageLookup::NoQr => {
            error_response("no qr code received yet", StatusCode::NOT_FOUND).into_response()
        }
    }
}

// ── Session ────────────────────────────────────────────────────

/// GET /api/status
pub async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.store.status().await)
}

/// POST /api/connected
pub async fn mark_connected(State(state): State<ApiState>) -> impl IntoResponse {
    let changed = state.store.mark_connected().await;
    ApiResponse::ok(serde_json::json!({ "changed": changed }))
}

/// POST /api/reset
pub async fn reset_session(State(state): State<ApiState>) -> impl IntoResponse {
    let previous = state.store.reset().await;
    ApiResponse::ok(serde_json::json!({ "previous": previous }))
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
