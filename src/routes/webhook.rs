//! Stripe webhook receiver
//!
//! The raw body is verified against the `Stripe-Signature` header before
//! it is parsed, so an unverifiable request never reaches the store.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::Value;
use tracing::{error, info};

use crate::{
    billing::{handle_event, verify_signature, WebhookEvent, SIGNATURE_HEADER},
    error::{AppError, AppResult},
    session::QuotaPolicy,
    store::SubscriptionStatus,
    AppState,
};

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Missing signature header".to_string()))?;

    if let Err(e) = verify_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        state.config.stripe_webhook_tolerance_seconds,
        chrono::Utc::now().timestamp(),
    ) {
        error!(error = %e, "Webhook signature verification failed");
        return Err(e);
    }

    let event = WebhookEvent::parse(&body)?;
    info!(event_type = %event.event_type, event_id = ?event.id, "Webhook event received");

    let outcome = handle_event(state.store.as_ref(), &event).await?;

    if let Some((user_id, status)) = outcome.affected_user() {
        state.profile_cache.invalidate_profile(user_id).await;
        if let Some(session) = state.sessions.get(user_id) {
            let policy = match status {
                SubscriptionStatus::Active => QuotaPolicy::Exempt,
                SubscriptionStatus::Inactive => QuotaPolicy::Enforced,
            };
            session.controller.set_quota_policy(policy);
        }
    }

    Ok(Json(outcome.to_body()))
}
