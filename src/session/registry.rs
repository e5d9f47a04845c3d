//! Per-user session registry
//!
//! One usage meter and one session controller per signed-in user, created
//! lazily on first use and dropped on sign-out. Entries without a running
//! session that nobody touched for `IDLE_ENTRY_TTL` are flushed and evicted
//! by a background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::{proxy::ChatService, store::ProfileStore, usage::UsageMeter};

use super::{controller::SessionController, observer::SessionObserver, state::EndReason};

/// How long an entry without a running session stays registered
pub const IDLE_ENTRY_TTL: Duration = Duration::from_secs(30 * 60);

/// Period of the eviction sweep
pub const EVICTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Meter and controller of one user
pub struct UserSession {
    pub meter: Arc<UsageMeter>,
    pub controller: SessionController,
    last_access: Mutex<Instant>,
}

impl UserSession {
    fn touch(&self) {
        *self.last_access.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

/// Registry of live user sessions
pub struct SessionRegistry {
    store: Arc<dyn ProfileStore>,
    chat: Arc<dyn ChatService>,
    observer: Arc<dyn SessionObserver>,
    idle_timeout: Duration,
    sessions: RwLock<HashMap<String, Arc<UserSession>>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        chat: Arc<dyn ChatService>,
        observer: Arc<dyn SessionObserver>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            chat,
            observer,
            idle_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Existing session of a user, if any
    pub fn get(&self, user_id: &str) -> Option<Arc<UserSession>> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned();
        if let Some(session) = &session {
            session.touch();
        }
        session
    }

    /// Session of a user, loading persisted usage on first access
    pub async fn get_or_create(&self, user_id: &str) -> Arc<UserSession> {
        if let Some(existing) = self.get(user_id) {
            return existing;
        }

        let meter = Arc::new(UsageMeter::new(self.store.clone()));
        meter.load(user_id).await;
        let controller = SessionController::new(
            user_id,
            meter.clone(),
            self.chat.clone(),
            self.observer.clone(),
            self.idle_timeout,
        );
        let created = Arc::new(UserSession {
            meter,
            controller,
            last_access: Mutex::new(Instant::now()),
        });

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id = %user_id, "Registered user session");
                created
            })
            .clone()
    }

    /// Seconds accrued this month for a user with a loaded meter
    pub fn live_seconds(&self, user_id: &str) -> Option<u64> {
        self.get(user_id)
            .and_then(|session| session.meter.current_seconds())
    }

    /// End the user's session, flush, and drop the in-memory record.
    ///
    /// Returns false when the user had no registered session.
    pub async fn sign_out(&self, user_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id);

        let Some(session) = removed else {
            return false;
        };
        session.controller.end(EndReason::SignOut).await;
        session.meter.sign_out();
        info!(user_id = %user_id, "User signed out");
        true
    }

    /// End every active session (used on shutdown)
    pub async fn end_all(&self, reason: EndReason) -> usize {
        let sessions: Vec<Arc<UserSession>> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut ended = 0;
        for session in sessions {
            if session.controller.end(reason).await {
                ended += 1;
            }
        }
        info!(ended = ended, reason = reason.as_str(), "Ended live sessions");
        ended
    }

    /// Flush and drop every entry without a running session that has not
    /// been accessed for `max_idle`. Returns the number of evicted entries.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted: Vec<(String, Arc<UserSession>)> = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let stale: Vec<String> = sessions
                .iter()
                .filter(|(_, s)| !s.controller.is_active() && s.idle_for() >= max_idle)
                .map(|(user_id, _)| user_id.clone())
                .collect();
            stale
                .into_iter()
                .filter_map(|user_id| sessions.remove(&user_id).map(|s| (user_id, s)))
                .collect()
        };

        for (user_id, session) in &evicted {
            let outcome = session.meter.force_save().await;
            debug!(user_id = %user_id, outcome = ?outcome, "Evicted idle user session");
        }
        if !evicted.is_empty() {
            info!(evicted = evicted.len(), "Evicted idle user sessions");
        }
        evicted.len()
    }

    /// Run `evict_idle` every `every` until the registry is dropped
    pub fn spawn_eviction(self: &Arc<Self>, every: Duration, max_idle: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle(max_idle).await;
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
