use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::orders::{self, WebhookOutcome};
use crate::payment::{verify_signature, SIGNATURE_HEADER};
use crate::state::AppState;

/// `POST /api/payments/webhook`
///
/// Authenticated only by the HMAC signature of the raw body. Once the
/// signature checks out the provider always gets a 200, whether or not an
/// order matched, so it does not retry; storage failures are the exception.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    let (Some(signature), Some(secret)) = (signature, state.config.paychangu_webhook_secret.as_deref())
    else {
        warn!("payment webhook without signature or configured secret");
        return Err(AppError::Validation("Webhook signature or secret missing".into()));
    };

    if !verify_signature(secret, &body, signature) {
        warn!("payment webhook signature mismatch");
        return Err(AppError::Unauthorized("Invalid signature".into()));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;

    match orders::apply_webhook(&state.store, &payload)? {
        WebhookOutcome::Paid(_) => {}
        outcome => debug!(?outcome, "payment webhook made no change"),
    }

    Ok(Json(json!({ "success": true, "message": "Webhook received" })))
}
