//! Polar webhook endpoint.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{DateTime, NaiveDateTime};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::ports::billing_provider::BillingEvent,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/billing", post(handle_webhook))
}

fn parse_rfc3339(value: &serde_json::Value) -> Option<NaiveDateTime> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.naive_utc())
}

/// Maps a raw provider payload onto [`BillingEvent`]. Anything with an
/// unrecognized type becomes [`BillingEvent::Unknown`]; a recognized type
/// with missing required fields is a malformed payload.
fn parse_event(payload: &serde_json::Value) -> AppResult<BillingEvent> {
    let event_type = payload["type"].as_str().unwrap_or("");
    let data = &payload["data"];

    let required = |field: &str| -> AppResult<String> {
        data[field]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidInput(format!("Missing {field} in webhook payload")))
    };

    match event_type {
        "subscription.created" | "subscription.active" | "subscription.updated" => {
            Ok(BillingEvent::SubscriptionCreated {
                subscription_id: required("id")?,
                customer_email: data["customer"]["email"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::InvalidInput("Missing customer email in webhook payload".into())
                    })?,
                plan_id: required("product_id")?,
                current_period_start: parse_rfc3339(&data["current_period_start"]),
                current_period_end: parse_rfc3339(&data["current_period_end"]),
                trial_end: parse_rfc3339(&data["trial_end"]),
            })
        }
        "subscription.canceled" | "subscription.revoked" => {
            Ok(BillingEvent::SubscriptionCanceled {
                subscription_id: required("id")?,
                customer_email: data["customer"]["email"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            })
        }
        other => Ok(BillingEvent::Unknown { event_type: other.to_string() }),
    }
}

/// Only transient failures are worth a provider retry; everything else is
/// acknowledged and logged so the provider stops resending.
fn is_retryable(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Database(_) | AppError::Internal(_) | AppError::BillingProvider(_)
    )
}

async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let signature = headers
        .get("webhook-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !app_state.billing.verify_webhook(&body, signature) {
        warn!("Rejected webhook with bad signature");
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Invalid signature" })),
        )
            .into_response());
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {e}")))?;
    let event = parse_event(&payload)?;

    match app_state.lifecycle.apply_billing_event(event).await {
        Ok(()) => Ok((StatusCode::OK, Json(json!({ "received": true }))).into_response()),
        Err(err) if is_retryable(&err) => {
            error!(error = %err, "Webhook processing failed, returning 500 for provider retry");
            Err(err)
        }
        Err(err) => {
            warn!(error = %err, "Webhook dropped after non-retryable failure");
            Ok((StatusCode::OK, Json(json!({ "received": true }))).into_response())
        }
    }
}
