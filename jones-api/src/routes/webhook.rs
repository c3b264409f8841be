use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use jones_shared::errors::{AppError, AppResult, ErrorCode};

use crate::payment::webhook::{verify_signature, BillingEvent, WebhookEvent};
use crate::AppState;

use super::blocking;

/// POST /payment/callback - billing provider events.
///
/// Once the signature checks out the event is always acknowledged; handler
/// failures are logged so the provider does not retry forever.
pub async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::InvalidWebhookSignature, "missing Stripe-Signature header"))?;

    verify_signature(&state.config.stripe_webhook_secret, signature, &body, Utc::now())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("invalid event payload: {e}")))?;
    let event_id = event.id.clone();
    let event_type = event.event_type.clone();
    tracing::info!(%event_id, %event_type, "billing event received");

    let subscriptions = state.subscriptions.clone();
    let handled = blocking(move || subscriptions.handle_event(BillingEvent::from_event(event)?)).await;
    if let Err(e) = handled {
        tracing::error!(%event_id, %event_type, error = %e, "failed to handle billing event");
    }

    Ok(Json(json!({ "status": "success" })))
}
