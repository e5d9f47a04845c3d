//! Conversation sessions
//!
//! Server-side session controller, its state machine and the per-user
//! registry that pairs each controller with a usage meter.

pub mod controller;
pub mod observer;
pub mod registry;
pub mod state;

pub use controller::{QuotaPolicy, SessionController, SessionStatus, TickOutcome, TICK_INTERVAL};
pub use observer::{SessionObserver, TracingObserver};
pub use registry::{SessionRegistry, UserSession, EVICTION_SWEEP_INTERVAL, IDLE_ENTRY_TTL};
pub use state::{transition, EndReason, SessionEvent, SessionState, TurnPhase};
