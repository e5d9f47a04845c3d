//! Usage endpoints
//!
//! Reports the caller's trial usage and, in debug builds of the
//! configuration, allows an administrative reset.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    middleware::{auth::AuthenticatedUser, quota::resolve_quota},
    usage::{FlushOutcome, UsageSummary},
    AppState,
};

/// Usage response
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub subscribed: bool,
    #[serde(flatten)]
    pub usage: UsageSummary,
}

/// Reset response
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub flush: FlushOutcome,
    pub usage: UsageSummary,
}

/// GET /api/usage
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<UsageResponse> {
    let session = state.sessions.get_or_create(&user.user_id).await;
    let quota = resolve_quota(&state, &user.user_id).await;
    Json(UsageResponse {
        subscribed: quota.subscribed,
        usage: session.meter.summary(),
    })
}

/// POST /api/usage/reset (debug only)
pub async fn reset_usage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ResetResponse>> {
    if !state.config.debug_enabled {
        return Err(AppError::NotFound("Not found".to_string()));
    }

    warn!(user_id = %user.user_id, "Administrative usage reset requested");
    let session = state.sessions.get_or_create(&user.user_id).await;
    let flush = session.meter.reset_usage().await;
    state.profile_cache.invalidate_profile(&user.user_id).await;

    Ok(Json(ResetResponse {
        flush,
        usage: session.meter.summary(),
    }))
}
