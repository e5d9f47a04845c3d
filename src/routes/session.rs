//! Conversation session endpoints
//!
//! The client drives its server-side session: start, report the turn
//! phase, submit utterances, end, flush on page hide, and sign out.

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    middleware::{auth::AuthenticatedUser, quota::resolve_quota},
    persona::Persona,
    proxy::TokenUsage,
    session::{EndReason, QuotaPolicy, SessionStatus, TurnPhase, UserSession},
    usage::FlushOutcome,
    AppState,
};

/// Start request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Start response
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    /// False when a session was already active
    pub started: bool,
    pub subscribed: bool,
    pub session: SessionStatus,
}

/// Phase update request
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseRequest {
    pub phase: TurnPhase,
}

/// Turn request
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub message: String,
}

/// Turn response
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub session: SessionStatus,
}

/// End response
#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    /// False when no session was active
    pub ended: bool,
    pub session: Option<SessionStatus>,
}

/// Registered session of a caller, or a conflict when there is none
fn existing_session(state: &AppState, user: &AuthenticatedUser) -> AppResult<Arc<UserSession>> {
    state
        .sessions
        .get(&user.user_id)
        .ok_or_else(|| AppError::Conflict("No active session".to_string()))
}

/// GET /api/session
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<SessionStatus> {
    let session = state.sessions.get_or_create(&user.user_id).await;
    Json(session.controller.status())
}

/// POST /api/session/start
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    request: Option<Json<StartSessionRequest>>,
) -> AppResult<Json<StartSessionResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session = state.sessions.get_or_create(&user.user_id).await;

    let quota = resolve_quota(&state, &user.user_id).await;
    quota.check()?;

    let persona = Persona::from_request(request.operator.as_deref(), request.category.as_deref());
    let policy = if quota.subscribed {
        QuotaPolicy::Exempt
    } else {
        QuotaPolicy::Enforced
    };

    let started = session.controller.start(persona, policy);
    info!(user_id = %user.user_id, started = started, subscribed = quota.subscribed, "Session start requested");

    Ok(Json(StartSessionResponse {
        started,
        subscribed: quota.subscribed,
        session: session.controller.status(),
    }))
}

/// POST /api/session/phase
pub async fn set_phase(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<PhaseRequest>,
) -> AppResult<Json<SessionStatus>> {
    let session = existing_session(&state, &user)?;
    session.controller.set_phase(request.phase)?;
    Ok(Json(session.controller.status()))
}

/// POST /api/session/turn
pub async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<TurnRequest>,
) -> AppResult<Json<TurnResponse>> {
    let session = existing_session(&state, &user)?;
    let reply = session.controller.submit_turn(&request.message).await?;
    Ok(Json(TurnResponse {
        text: reply.text,
        usage: reply.usage,
        session: session.controller.status(),
    }))
}

/// POST /api/session/end
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<EndSessionResponse> {
    let Some(session) = state.sessions.get(&user.user_id) else {
        return Json(EndSessionResponse {
            ended: false,
            session: None,
        });
    };
    let ended = session.controller.end(EndReason::Requested).await;
    Json(EndSessionResponse {
        ended,
        session: Some(session.controller.status()),
    })
}

/// POST /api/session/flush
///
/// Sent when the page is hidden or unloaded, where a later periodic flush
/// might never run.
pub async fn flush_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<FlushOutcome> {
    let Some(session) = state.sessions.get(&user.user_id) else {
        return Json(FlushOutcome::Skipped);
    };
    Json(session.meter.force_save().await)
}

/// DELETE /api/session
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<Value> {
    let signed_out = state.sessions.sign_out(&user.user_id).await;
    Json(json!({ "signed_out": signed_out }))
}
