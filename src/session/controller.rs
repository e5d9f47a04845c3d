//! Conversation session controller
//!
//! Owns start/stop of one user's conversation and drives the one second
//! tick that feeds the usage meter. The tick only bills while a turn is in
//! flight (listening or processing) and force-ends the session as soon as
//! the trial allowance is used up.
//!
//! Ending is idempotent and always stops both timers before the final
//! flush, so no tick can accrue usage after a session is over.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    persona::Persona,
    proxy::{ChatMessage, ChatReply, ChatService},
    usage::{FlushOutcome, UsageMeter, UsageSummary, TRIAL_LIMIT_SECONDS},
};

use super::{
    observer::SessionObserver,
    state::{transition, EndReason, SessionEvent, SessionState, TurnPhase},
};

/// Period of the usage tick
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Seconds billed per tick
const TICK_SECONDS: u64 = 1;

/// Whether running out of trial time ends the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaPolicy {
    #[default]
    Enforced,
    /// Subscribers: usage still accrues but never ends the session
    Exempt,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    QuotaExceeded,
    IdleTimeout,
    /// The session is no longer active
    Stopped,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Id of the running conversation, `None` while idle
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    pub phase: TurnPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub turns: usize,
    pub last_end_reason: Option<EndReason>,
    pub usage: UsageSummary,
}

struct Core {
    session_id: Option<Uuid>,
    state: SessionState,
    phase: TurnPhase,
    started_at: Option<DateTime<Utc>>,
    transcript: Vec<ChatMessage>,
    persona: Persona,
    policy: QuotaPolicy,
    last_activity: Instant,
    last_end_reason: Option<EndReason>,
}

impl Core {
    fn new() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
            phase: TurnPhase::Waiting,
            started_at: None,
            transcript: Vec::new(),
            persona: Persona::default(),
            policy: QuotaPolicy::Enforced,
            last_activity: Instant::now(),
            last_end_reason: None,
        }
    }

    fn require_active(&self) -> AppResult<()> {
        if self.state == SessionState::Active {
            Ok(())
        } else {
            Err(AppError::Conflict("No active session".to_string()))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SessionInner {
    user_id: String,
    meter: Arc<UsageMeter>,
    chat: Arc<dyn ChatService>,
    observer: Arc<dyn SessionObserver>,
    core: Mutex<Core>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    idle_timeout: Duration,
}

impl SessionInner {
    fn tick(&self) -> TickOutcome {
        let (billable, policy, idle_for) = {
            let core = lock(&self.core);
            if core.state != SessionState::Active {
                return TickOutcome::Stopped;
            }
            (
                core.phase.is_billable(),
                core.policy,
                core.last_activity.elapsed(),
            )
        };

        if billable {
            self.meter.add_usage(TICK_SECONDS);
        }

        if policy == QuotaPolicy::Enforced && self.meter.has_exceeded_limit() {
            return TickOutcome::QuotaExceeded;
        }

        if idle_for >= self.idle_timeout {
            return TickOutcome::IdleTimeout;
        }

        TickOutcome::Continue
    }

    /// End the session. `abort_tick` is false when called from the tick
    /// task itself, which exits on its own afterwards.
    async fn end(&self, reason: EndReason, abort_tick: bool) -> bool {
        let session_id = {
            let mut core = lock(&self.core);
            let Some(next) = transition(core.state, SessionEvent::End) else {
                return false;
            };
            core.state = next;
            core.phase = TurnPhase::Waiting;
            core.started_at = None;
            core.transcript.clear();
            core.last_end_reason = Some(reason);
            core.session_id.take()
        };

        let handle = lock(&self.tick_task).take();
        if let Some(handle) = handle {
            if abort_tick {
                handle.abort();
            }
        }
        self.meter.stop_periodic_save();

        let outcome = self.meter.force_save().await;
        info!(
            user_id = %self.user_id,
            session_id = ?session_id,
            reason = reason.as_str(),
            total_seconds = self.meter.total_seconds(),
            flushed = matches!(outcome, FlushOutcome::Persisted { .. }),
            "Session ended"
        );

        self.observer.on_disconnect(&self.user_id, reason);
        if reason == EndReason::QuotaExceeded {
            self.observer.on_quota_exceeded(
                &self.user_id,
                self.meter.used_minutes(),
                self.meter.used_seconds_remainder(),
            );
        }
        true
    }
}

/// Returns a turn to listening if its future is dropped before the reply
/// arrives (client disconnect or request timeout). Only touches the session
/// the turn was started in.
struct TurnGuard<'a> {
    inner: &'a SessionInner,
    session_id: Option<Uuid>,
    armed: bool,
}

impl TurnGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut core = lock(&self.inner.core);
        if core.state == SessionState::Active
            && core.session_id == self.session_id
            && core.phase == TurnPhase::Processing
        {
            core.phase = TurnPhase::Listening;
            core.last_activity = Instant::now();
            warn!(
                user_id = %self.inner.user_id,
                session_id = ?self.session_id,
                "Turn cancelled before the reply arrived, returning to listening"
            );
        }
    }
}

async fn run_ticks(inner: Weak<SessionInner>) {
    let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let reason = match inner.tick() {
            TickOutcome::Continue => continue,
            TickOutcome::Stopped => break,
            TickOutcome::QuotaExceeded => EndReason::QuotaExceeded,
            TickOutcome::IdleTimeout => EndReason::IdleTimeout,
        };
        inner.end(reason, false).await;
        break;
    }
}

/// Session controller for one user
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(
        user_id: impl Into<String>,
        meter: Arc<UsageMeter>,
        chat: Arc<dyn ChatService>,
        observer: Arc<dyn SessionObserver>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                user_id: user_id.into(),
                meter,
                chat,
                observer,
                core: Mutex::new(Core::new()),
                tick_task: Mutex::new(None),
                idle_timeout,
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn meter(&self) -> &Arc<UsageMeter> {
        &self.inner.meter
    }

    /// Start a session. Returns false (and changes nothing) when one is
    /// already active.
    pub fn start(&self, persona: Persona, policy: QuotaPolicy) -> bool {
        {
            let mut core = lock(&self.inner.core);
            let Some(next) = transition(core.state, SessionEvent::Start) else {
                debug!(user_id = %self.inner.user_id, "Session already active");
                return false;
            };
            core.state = next;
            core.session_id = Some(Uuid::new_v4());
            core.phase = TurnPhase::Waiting;
            core.started_at = Some(Utc::now());
            core.transcript.clear();
            core.persona = persona;
            core.policy = policy;
            core.last_activity = Instant::now();
        }

        {
            let mut slot = lock(&self.inner.tick_task);
            if let Some(stale) = slot.take() {
                stale.abort();
            }
            *slot = Some(tokio::spawn(run_ticks(Arc::downgrade(&self.inner))));
        }

        self.inner.meter.start_periodic_save();
        self.inner.observer.on_connect(&self.inner.user_id);
        true
    }

    /// Run one tick by hand. The background task calls the same logic.
    pub fn tick(&self) -> TickOutcome {
        self.inner.tick()
    }

    /// End the session. Safe to call when already idle.
    pub async fn end(&self, reason: EndReason) -> bool {
        self.inner.end(reason, true).await
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.core).state == SessionState::Active
    }

    /// Record the client-reported turn phase
    pub fn set_phase(&self, phase: TurnPhase) -> AppResult<()> {
        if phase == TurnPhase::Processing {
            return Err(AppError::BadRequest(
                "The processing phase is set by the server".to_string(),
            ));
        }

        let mut core = lock(&self.inner.core);
        core.require_active()?;
        if core.phase == TurnPhase::Processing {
            return Err(AppError::Conflict(
                "A turn is being processed".to_string(),
            ));
        }
        core.phase = phase;
        core.last_activity = Instant::now();
        Ok(())
    }

    /// Change the quota policy of a running session, e.g. after a
    /// subscription change arrives mid-conversation
    pub fn set_quota_policy(&self, policy: QuotaPolicy) {
        lock(&self.inner.core).policy = policy;
    }

    pub fn phase(&self) -> TurnPhase {
        lock(&self.inner.core).phase
    }

    /// Send one user utterance and return the assistant reply.
    ///
    /// On a chat failure the utterance stays in the transcript and the
    /// phase returns to listening so the client can retry or type instead.
    /// The same happens when the returned future is dropped mid-call.
    pub async fn submit_turn(&self, message: &str) -> AppResult<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::BadRequest("Message must not be empty".to_string()));
        }

        let policy = {
            let core = lock(&self.inner.core);
            core.require_active()?;
            if core.phase == TurnPhase::Processing {
                return Err(AppError::Conflict(
                    "A turn is already being processed".to_string(),
                ));
            }
            core.policy
        };

        if policy == QuotaPolicy::Enforced && self.inner.meter.has_exceeded_limit() {
            let used_seconds = self.inner.meter.total_seconds();
            self.inner.end(EndReason::QuotaExceeded, true).await;
            return Err(AppError::trial_exhausted(TRIAL_LIMIT_SECONDS, used_seconds));
        }

        let (session_id, history, persona) = {
            let mut core = lock(&self.inner.core);
            core.require_active()?;
            core.phase = TurnPhase::Processing;
            core.transcript.push(ChatMessage::user(message));
            core.last_activity = Instant::now();
            (core.session_id, core.transcript.clone(), core.persona.clone())
        };

        let guard = TurnGuard {
            inner: &self.inner,
            session_id,
            armed: true,
        };
        let result = self.inner.chat.send(&history, &persona).await;
        guard.disarm();

        let mut core = lock(&self.inner.core);
        let active = core.state == SessionState::Active && core.session_id == session_id;
        match result {
            Ok(reply) => {
                if active {
                    core.transcript.push(ChatMessage::assistant(reply.text.clone()));
                    core.phase = TurnPhase::Speaking;
                    core.last_activity = Instant::now();
                }
                Ok(reply)
            }
            Err(e) => {
                warn!(
                    user_id = %self.inner.user_id,
                    provider = self.inner.chat.name(),
                    error = %e,
                    "Chat turn failed, returning to listening"
                );
                if active {
                    core.phase = TurnPhase::Listening;
                }
                Err(e)
            }
        }
    }

    /// Copy of the conversation so far
    pub fn transcript(&self) -> Vec<ChatMessage> {
        lock(&self.inner.core).transcript.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let (session_id, state, phase, started_at, turns, last_end_reason) = {
            let core = lock(&self.inner.core);
            (
                core.session_id,
                core.state,
                core.phase,
                core.started_at,
                core.transcript.len(),
                core.last_end_reason,
            )
        };
        SessionStatus {
            session_id,
            state,
            phase,
            started_at,
            turns,
            last_end_reason,
            usage: self.inner.meter.summary(),
        }
    }
}
