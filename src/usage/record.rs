//! Usage record and trial constants
//!
//! A record counts conversation seconds for one user in one calendar month.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Conversation time granted before payment is required
pub const TRIAL_LIMIT_SECONDS: u64 = 10 * 60;

/// Slack above the limit so a tick in flight is never truncated
pub const OVERFLOW_SLACK_SECONDS: u64 = 60;

/// Hard ceiling for `total_seconds`
pub const MAX_RECORDED_SECONDS: u64 = TRIAL_LIMIT_SECONDS + OVERFLOW_SLACK_SECONDS;

/// Billing period tag in `YYYY-MM` form
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}

/// Seconds to persisted minutes; a started minute counts as used
pub fn seconds_to_billed_minutes(seconds: u64) -> i64 {
    seconds.div_ceil(60) as i64
}

/// In-memory usage for one user and one month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub user_id: String,
    pub month_key: String,
    pub total_seconds: u64,
    pub last_updated: DateTime<Utc>,
}

impl UsageRecord {
    /// A zero-valued record for the month containing `at`
    pub fn fresh(user_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            month_key: month_key(at),
            total_seconds: 0,
            last_updated: at,
        }
    }

    /// A record seeded from persisted minutes
    pub fn from_minutes(user_id: &str, minutes: i64, at: DateTime<Utc>) -> Self {
        let seconds = (minutes.max(0) as u64).saturating_mul(60);
        Self {
            total_seconds: seconds.min(MAX_RECORDED_SECONDS),
            ..Self::fresh(user_id, at)
        }
    }

    /// Add seconds, starting a new period first if the month changed.
    ///
    /// The total never decreases within a period and never exceeds
    /// `MAX_RECORDED_SECONDS`.
    pub fn accrue(&mut self, delta_seconds: u64, at: DateTime<Utc>) {
        self.roll_over(at);
        self.total_seconds = self
            .total_seconds
            .saturating_add(delta_seconds)
            .min(MAX_RECORDED_SECONDS);
        self.last_updated = at;
    }

    /// Start a new period at zero if `at` falls in another month.
    /// Returns true when the record was reset.
    pub fn roll_over(&mut self, at: DateTime<Utc>) -> bool {
        let current = month_key(at);
        if current == self.month_key {
            return false;
        }
        self.month_key = current;
        self.total_seconds = 0;
        true
    }

    /// Seconds that count against the period containing `at`
    pub fn seconds_in(&self, at: DateTime<Utc>) -> u64 {
        if self.month_key == month_key(at) {
            self.total_seconds
        } else {
            0
        }
    }

    /// Minutes written to the store for this record
    pub fn billed_minutes(&self) -> i64 {
        seconds_to_billed_minutes(self.total_seconds)
    }
}
