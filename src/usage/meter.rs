//! Trial usage meter
//!
//! Keeps the authoritative in-memory usage record for one signed-in user and
//! batches writes to the profile store. Local increments are cheap and never
//! block; remote writes happen on a 15 second timer and on forced flushes.
//!
//! Store failures never escape: a failed load starts from zero and a failed
//! write leaves the in-memory record untouched for the next flush.
//!
//! Every view reads the record through the current month, so a record left
//! over from a past month counts as zero. Flushes run one at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::store::ProfileStore;

use super::record::{month_key, UsageRecord, TRIAL_LIMIT_SECONDS};

/// Period of the background flush
pub const PERIODIC_SAVE_INTERVAL: Duration = Duration::from_secs(15);

/// Result of writing the in-memory record to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// The record was written with this many minutes
    Persisted { minutes: i64 },
    /// Nothing to write
    Skipped,
    /// The store rejected the write; the in-memory record is unchanged
    Failed,
}

/// What caused a flush (used for logs and metrics)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Periodic,
    Forced,
    Reset,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Periodic => "periodic",
            FlushTrigger::Forced => "forced",
            FlushTrigger::Reset => "reset",
        }
    }
}

/// Display view of the current usage
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageSummary {
    pub total_seconds: u64,
    pub used_minutes: u64,
    pub used_seconds_remainder: u64,
    pub remaining_seconds: u64,
    pub remaining_minutes: u64,
    pub limit_seconds: u64,
    pub limit_minutes: u64,
    pub exceeded: bool,
    pub month: Option<String>,
}

#[derive(Debug, Default)]
struct MeterState {
    record: Option<UsageRecord>,
    authenticated: bool,
}

fn lock_state(state: &Mutex<MeterState>) -> MutexGuard<'_, MeterState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Usage meter for one authenticated user
pub struct UsageMeter {
    store: Arc<dyn ProfileStore>,
    state: Arc<Mutex<MeterState>>,
    /// Held from snapshot to store write
    flush_gate: Arc<AsyncMutex<()>>,
    save_task: Mutex<Option<JoinHandle<()>>>,
    save_interval: Duration,
}

impl UsageMeter {
    /// Create an empty meter; call `load` after sign-in
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self::with_save_interval(store, PERIODIC_SAVE_INTERVAL)
    }

    /// Create a meter with a custom flush period
    pub fn with_save_interval(store: Arc<dyn ProfileStore>, save_interval: Duration) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(MeterState::default())),
            flush_gate: Arc::new(AsyncMutex::new(())),
            save_task: Mutex::new(None),
            save_interval,
        }
    }

    /// Load persisted usage for a user and mark the meter authenticated.
    ///
    /// A missing row or an unreachable store yields a zero record so the
    /// user gets the full trial instead of being blocked.
    pub async fn load(&self, user_id: &str) -> UsageRecord {
        let now = Utc::now();
        let record = match self.store.get_usage_minutes(user_id).await {
            Ok(Some(minutes)) => UsageRecord::from_minutes(user_id, minutes, now),
            Ok(None) => {
                warn!(user_id = %user_id, "No profile row for user, starting trial usage at zero");
                UsageRecord::fresh(user_id, now)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to load trial usage, starting at zero");
                UsageRecord::fresh(user_id, now)
            }
        };

        info!(
            user_id = %user_id,
            total_seconds = record.total_seconds,
            month = %record.month_key,
            "Trial usage loaded"
        );

        let mut state = lock_state(&self.state);
        state.record = Some(record.clone());
        state.authenticated = true;
        record
    }

    /// Mirror the caller's authentication state.
    ///
    /// While unauthenticated `add_usage` is a no-op.
    pub fn set_authenticated(&self, authenticated: bool) {
        lock_state(&self.state).authenticated = authenticated;
    }

    pub fn is_authenticated(&self) -> bool {
        lock_state(&self.state).authenticated
    }

    /// Drop the in-memory record and stop flushing. The remote row persists.
    pub fn sign_out(&self) {
        self.stop_periodic_save();
        let mut state = lock_state(&self.state);
        state.record = None;
        state.authenticated = false;
        debug!("Usage meter cleared on sign-out");
    }

    /// Add seconds to the in-memory record.
    ///
    /// Returns false when there is no record or the caller is not
    /// authenticated. Never touches the store.
    pub fn add_usage(&self, delta_seconds: u64) -> bool {
        self.add_usage_at(delta_seconds, Utc::now())
    }

    pub(crate) fn add_usage_at(&self, delta_seconds: u64, now: DateTime<Utc>) -> bool {
        let mut state = lock_state(&self.state);
        if !state.authenticated {
            return false;
        }
        let Some(record) = state.record.as_mut() else {
            return false;
        };
        record.accrue(delta_seconds, now);
        metrics::record_usage_seconds(delta_seconds);
        true
    }

    /// Whether the trial allowance is used up
    pub fn has_exceeded_limit(&self) -> bool {
        self.total_seconds() >= TRIAL_LIMIT_SECONDS
    }

    /// Seconds accrued this month, `None` without a loaded record
    pub fn current_seconds(&self) -> Option<u64> {
        let now = Utc::now();
        lock_state(&self.state)
            .record
            .as_ref()
            .map(|r| r.seconds_in(now))
    }

    /// Seconds accrued this month (zero without a record)
    pub fn total_seconds(&self) -> u64 {
        self.current_seconds().unwrap_or(0)
    }

    pub fn remaining_seconds(&self) -> u64 {
        TRIAL_LIMIT_SECONDS.saturating_sub(self.total_seconds())
    }

    /// Remaining whole minutes, rounded up
    pub fn remaining_minutes(&self) -> u64 {
        self.remaining_seconds().div_ceil(60)
    }

    /// Used whole minutes, rounded down
    pub fn used_minutes(&self) -> u64 {
        self.total_seconds() / 60
    }

    pub fn used_seconds_remainder(&self) -> u64 {
        self.total_seconds() % 60
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> Option<UsageRecord> {
        lock_state(&self.state).record.clone()
    }

    pub fn summary(&self) -> UsageSummary {
        let now = Utc::now();
        let (total_seconds, month) = {
            let state = lock_state(&self.state);
            match state.record.as_ref() {
                Some(r) => (r.seconds_in(now), Some(month_key(now))),
                None => (0, None),
            }
        };
        let remaining_seconds = TRIAL_LIMIT_SECONDS.saturating_sub(total_seconds);
        UsageSummary {
            total_seconds,
            used_minutes: total_seconds / 60,
            used_seconds_remainder: total_seconds % 60,
            remaining_seconds,
            remaining_minutes: remaining_seconds.div_ceil(60),
            limit_seconds: TRIAL_LIMIT_SECONDS,
            limit_minutes: TRIAL_LIMIT_SECONDS / 60,
            exceeded: total_seconds >= TRIAL_LIMIT_SECONDS,
            month,
        }
    }

    /// Start the recurring flush. A no-op if it is already running.
    pub fn start_periodic_save(&self) {
        let mut slot = self.save_task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let state = self.state.clone();
        let gate = self.flush_gate.clone();
        let store = self.store.clone();
        let period = self.save_interval;

        debug!(period_secs = period.as_secs(), "Starting periodic usage save");
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                flush(&state, &gate, store.as_ref(), FlushTrigger::Periodic).await;
            }
        }));
    }

    /// Stop the recurring flush
    pub fn stop_periodic_save(&self) {
        let mut slot = self.save_task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            debug!("Stopping periodic usage save");
            handle.abort();
        }
    }

    pub fn is_saving_periodically(&self) -> bool {
        self.save_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Write the current record now
    pub async fn force_save(&self) -> FlushOutcome {
        flush(
            &self.state,
            &self.flush_gate,
            self.store.as_ref(),
            FlushTrigger::Forced,
        )
        .await
    }

    /// Administrative reset: replace the record with a zero record for the
    /// current month and persist it.
    pub async fn reset_usage(&self) -> FlushOutcome {
        {
            let mut state = lock_state(&self.state);
            if !state.authenticated {
                return FlushOutcome::Skipped;
            }
            let Some(user_id) = state.record.as_ref().map(|r| r.user_id.clone()) else {
                return FlushOutcome::Skipped;
            };
            info!(user_id = %user_id, "Resetting trial usage");
            state.record = Some(UsageRecord::fresh(&user_id, Utc::now()));
        }
        flush(
            &self.state,
            &self.flush_gate,
            self.store.as_ref(),
            FlushTrigger::Reset,
        )
        .await
    }
}

impl Drop for UsageMeter {
    fn drop(&mut self) {
        self.stop_periodic_save();
    }
}

/// Write the record held in `state` to the store.
///
/// `gate` is held until the write returns, so a slow write can never land
/// after a later one and overwrite it with an older value.
async fn flush(
    state: &Mutex<MeterState>,
    gate: &AsyncMutex<()>,
    store: &dyn ProfileStore,
    trigger: FlushTrigger,
) -> FlushOutcome {
    let _in_flight = gate.lock().await;

    let snapshot = {
        let mut state = lock_state(state);
        state.record.as_mut().map(|record| {
            record.roll_over(Utc::now());
            record.clone()
        })
    };
    let Some(record) = snapshot else {
        return FlushOutcome::Skipped;
    };

    let minutes = record.billed_minutes();
    match store.set_usage_minutes(&record.user_id, minutes).await {
        Ok(()) => {
            debug!(
                user_id = %record.user_id,
                total_seconds = record.total_seconds,
                minutes = minutes,
                trigger = trigger.as_str(),
                "Trial usage saved"
            );
            metrics::record_flush(trigger, "success");
            FlushOutcome::Persisted { minutes }
        }
        Err(e) => {
            error!(
                user_id = %record.user_id,
                total_seconds = record.total_seconds,
                trigger = trigger.as_str(),
                error = %e,
                "Failed to save trial usage"
            );
            metrics::record_flush(trigger, "failure");
            FlushOutcome::Failed
        }
    }
}

/// Metrics for the usage meter
pub mod metrics {
    use metrics::counter;

    use super::FlushTrigger;

    /// Record accrued conversation seconds
    pub fn record_usage_seconds(seconds: u64) {
        counter!("cartomante_usage_seconds_total").increment(seconds);
    }

    /// Record a flush attempt
    pub fn record_flush(trigger: FlushTrigger, result: &'static str) {
        counter!(
            "cartomante_usage_flushes_total",
            "trigger" => trigger.as_str(),
            "result" => result
        )
        .increment(1);
    }
}
