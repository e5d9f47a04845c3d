//! Trial quota gate
//!
//! Rejects chat and speech requests from users without a subscription once
//! their trial allowance is used up. Usage comes from the live meter when
//! the user has one, otherwise from the persisted profile.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    usage::TRIAL_LIMIT_SECONDS,
    AppState,
};

/// Quota check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub subscribed: bool,
    pub used_seconds: u64,
}

impl QuotaStatus {
    pub fn check(&self) -> AppResult<()> {
        if self.subscribed || self.used_seconds < TRIAL_LIMIT_SECONDS {
            Ok(())
        } else {
            Err(AppError::trial_exhausted(
                TRIAL_LIMIT_SECONDS,
                self.used_seconds,
            ))
        }
    }
}

/// Resolve the quota status of a user.
///
/// A failed profile read counts as unsubscribed with whatever usage is
/// known, so an outage never blocks a user who still has trial time.
pub async fn resolve_quota(state: &AppState, user_id: &str) -> QuotaStatus {
    let profile = match state.profile_cache.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Profile lookup failed, assuming trial user");
            None
        }
    };

    let subscribed = profile.as_ref().is_some_and(|p| p.is_subscribed());
    let used_seconds = state
        .sessions
        .live_seconds(user_id)
        .or_else(|| profile.as_ref().map(|p| p.trial_seconds_used()))
        .unwrap_or(0);

    QuotaStatus {
        subscribed,
        used_seconds,
    }
}

/// Quota middleware (runs after authentication)
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn quota_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;

    let status = resolve_quota(&state, &user.user_id).await;
    debug!(
        user_id = %user.user_id,
        subscribed = status.subscribed,
        used_seconds = status.used_seconds,
        "Quota checked"
    );

    if let Err(e) = status.check() {
        metrics::record_rejection();
        return Err(e);
    }

    Ok(next.run(request).await)
}

/// Metrics for the quota gate
pub mod metrics {
    use metrics::counter;

    pub fn record_rejection() {
        counter!("cartomante_quota_rejections_total").increment(1);
    }
}
