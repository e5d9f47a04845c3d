//! Session state machine
//!
//! A session is either idle or active. Turn phases are transient flags that
//! only decide whether a tick is billable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    End,
}

/// Transition table.
///
/// Returns the next state, or `None` when the event does not apply to the
/// current state and must be ignored.
pub fn transition(state: SessionState, event: SessionEvent) -> Option<SessionState> {
    match (state, event) {
        (SessionState::Idle, SessionEvent::Start) => Some(SessionState::Active),
        (SessionState::Active, SessionEvent::End) => Some(SessionState::Idle),
        (SessionState::Active, SessionEvent::Start) | (SessionState::Idle, SessionEvent::End) => {
            None
        }
    }
}

/// Where the current turn is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    /// Nothing in flight
    #[default]
    Waiting,
    /// The user is speaking or typing
    Listening,
    /// Waiting on the assistant reply
    Processing,
    /// The assistant reply is being played back
    Speaking,
}

impl TurnPhase {
    /// Whether a tick in this phase counts towards usage
    pub fn is_billable(&self) -> bool {
        matches!(self, TurnPhase::Listening | TurnPhase::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Waiting => "waiting",
            TurnPhase::Listening => "listening",
            TurnPhase::Processing => "processing",
            TurnPhase::Speaking => "speaking",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TurnPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(TurnPhase::Waiting),
            "listening" => Ok(TurnPhase::Listening),
            "processing" => Ok(TurnPhase::Processing),
            "speaking" => Ok(TurnPhase::Speaking),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The client asked to end
    Requested,
    /// The trial allowance ran out mid-session
    QuotaExceeded,
    /// No client activity within the idle timeout
    IdleTimeout,
    SignOut,
    Shutdown,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Requested => "requested",
            EndReason::QuotaExceeded => "quota_exceeded",
            EndReason::IdleTimeout => "idle_timeout",
            EndReason::SignOut => "sign_out",
            EndReason::Shutdown => "shutdown",
        }
    }
}
