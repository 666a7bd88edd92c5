//! HTTP request handlers

use super::twiml::TwiML;
use super::types::{ErrorResponse, TwilioWebhook};
use super::AppState;
use crate::report::StoredReport;
use crate::runtime::ReportStore;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Twilio WhatsApp webhook
        .route("/whatsapp", post(whatsapp_webhook))
        // Dashboard feed
        .route("/reports", get(list_reports))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// Conversation failures are answered in-band; only a form without a sender
/// is rejected.
async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(form): Form<TwilioWebhook>,
) -> Result<TwiML, AppError> {
    if form.from.trim().is_empty() {
        return Err(AppError::BadRequest("Missing From".to_string()));
    }

    let message = form.into_message();
    tracing::info!(
        sender = %message.sender_id,
        num_media = message.num_media,
        "Inbound WhatsApp message"
    );

    let replies = state.engine.handle_message(message).await;
    Ok(TwiML::messages(&replies))
}

// ============================================================
// Reports
// ============================================================

async fn list_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredReport>>, AppError> {
    let reports = state
        .engine
        .reports()
        .list_reports()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(reports))
}

async fn get_version() -> &'static str {
    concat!("ecovoice ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
