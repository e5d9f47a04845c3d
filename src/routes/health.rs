//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with dependency status
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual dependency check result
#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dependency checks collection
#[derive(Debug, Serialize)]
pub struct DependencyChecks {
    pub cache: DependencyCheck,
    pub chat_provider: DependencyCheck,
}

/// Application statistics
#[derive(Debug, Serialize)]
pub struct HealthStats {
    pub uptime_seconds: u64,
    pub registered_sessions: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub checks: DependencyChecks,
    pub stats: HealthStats,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

async fn check_cache(state: &AppState) -> DependencyCheck {
    let start = Instant::now();
    let result = state.profile_cache.backend().ping().await;
    DependencyCheck {
        status: if result.is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        latency_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|e| e.to_string()),
    }
}

/// The chat provider degrades the service without taking it down
fn check_chat_provider(state: &AppState) -> DependencyCheck {
    if state.config.openai_api_key.is_some() {
        DependencyCheck {
            status: HealthStatus::Healthy,
            latency_ms: 0,
            error: None,
        }
    } else {
        DependencyCheck {
            status: HealthStatus::Degraded,
            latency_ms: 0,
            error: Some("OPENAI_API_KEY is not configured".to_string()),
        }
    }
}

fn overall(checks: &DependencyChecks) -> HealthStatus {
    let statuses = [&checks.cache.status, &checks.chat_provider.status];
    if statuses.contains(&&HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if statuses.contains(&&HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Full health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let checks = DependencyChecks {
        cache: check_cache(&state).await,
        chat_provider: check_chat_provider(&state),
    };
    let overall_status = overall(&checks);
    let uptime = state.start_time.elapsed().as_secs();

    let response = HealthResponse {
        status: overall_status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
        stats: HealthStats {
            uptime_seconds: uptime,
            registered_sessions: state.sessions.len(),
        },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Readiness probe endpoint
///
/// Returns 200 OK if the cache is reachable.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    if check_cache(&state).await.status == HealthStatus::Unhealthy {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
