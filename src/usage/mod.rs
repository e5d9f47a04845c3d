//! Usage tracking module
//!
//! Meters trial conversation time and persists it to the profile store.

pub mod meter;
pub mod record;

pub use meter::{FlushOutcome, FlushTrigger, UsageMeter, UsageSummary, PERIODIC_SAVE_INTERVAL};
pub use record::{
    month_key, seconds_to_billed_minutes, UsageRecord, MAX_RECORDED_SECONDS,
    OVERFLOW_SLACK_SECONDS, TRIAL_LIMIT_SECONDS,
};
