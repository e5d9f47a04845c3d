//! Session notifications
//!
//! The controller reports connection changes and quota cut-offs to an
//! observer instead of calling the UI layer directly.

use tracing::{info, warn};

use super::state::EndReason;

/// Receiver of session lifecycle notifications
pub trait SessionObserver: Send + Sync {
    fn on_connect(&self, user_id: &str);

    fn on_disconnect(&self, user_id: &str, reason: EndReason);

    /// The session was ended because the trial allowance ran out
    fn on_quota_exceeded(&self, user_id: &str, used_minutes: u64, used_seconds: u64);
}

/// Observer that logs events and keeps session metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_connect(&self, user_id: &str) {
        info!(user_id = %user_id, "Session connected");
        metrics::session_started();
    }

    fn on_disconnect(&self, user_id: &str, reason: EndReason) {
        info!(user_id = %user_id, reason = reason.as_str(), "Session disconnected");
        metrics::session_ended(reason);
    }

    fn on_quota_exceeded(&self, user_id: &str, used_minutes: u64, used_seconds: u64) {
        warn!(
            user_id = %user_id,
            used_minutes = used_minutes,
            used_seconds = used_seconds,
            "Trial quota exhausted, session ended"
        );
    }
}

/// Metrics for sessions
pub mod metrics {
    use metrics::{counter, gauge};

    use super::EndReason;

    pub fn session_started() {
        counter!("cartomante_sessions_started_total").increment(1);
        gauge!("cartomante_active_sessions").increment(1.0);
    }

    pub fn session_ended(reason: EndReason) {
        counter!("cartomante_sessions_ended_total", "reason" => reason.as_str()).increment(1);
        gauge!("cartomante_active_sessions").decrement(1.0);
    }
}
