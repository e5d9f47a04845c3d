//! HTTP routes for Cartomante
//!
//! This module defines all HTTP endpoints exposed by the service.

pub mod chat;
pub mod health;
pub mod metrics;
pub mod session;
pub mod speech;
pub mod usage;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    middleware::{auth::auth_middleware, quota::quota_middleware},
    AppState,
};

/// Upper bound for a request before the server answers 408
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Middleware is applied in reverse order (last applied runs first)
    // So: auth runs first, then the quota gate
    let metered_routes = Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/text-to-speech", post(speech::text_to_speech))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            quota_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let session_routes = Router::new()
        .route(
            "/api/session",
            get(session::get_session).delete(session::sign_out),
        )
        .route("/api/session/start", post(session::start_session))
        .route("/api/session/phase", post(session::set_phase))
        .route("/api/session/turn", post(session::submit_turn))
        .route("/api/session/end", post(session::end_session))
        .route("/api/session/flush", post(session::flush_session))
        .route("/api/usage", get(usage::get_usage))
        .route("/api/usage/reset", post(usage::reset_usage))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Public routes (health checks, metrics, signed webhooks) - no auth required
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/api/stripe/webhook", post(webhook::stripe_webhook));

    Router::new()
        .merge(public_routes)
        .merge(metered_routes)
        .merge(session_routes)
        // Global middleware (applied to all routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
