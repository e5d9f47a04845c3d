//! Profile store abstraction
//!
//! One profile row per user holds the persisted trial usage (in whole
//! minutes) and the subscription linkage written by the billing webhook.

#[cfg(any(test, feature = "test-utils"))]
pub mod in_memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[cfg(any(test, feature = "test-utils"))]
pub use in_memory::InMemoryProfileStore;

/// Subscription state of a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }
}

/// Persisted profile row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub free_trial_minutes_used: i64,
    #[serde(default)]
    pub subscription_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Whether the user has a paid subscription
    pub fn is_subscribed(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Active
    }

    /// Persisted trial usage expressed in seconds
    pub fn trial_seconds_used(&self) -> u64 {
        (self.free_trial_minutes_used.max(0) as u64).saturating_mul(60)
    }
}

/// Backing store for profiles.
///
/// Every method is a remote call in production; callers decide how a
/// failure degrades (see the usage meter and the webhook handler).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Persisted trial minutes for a user, `None` when no row exists
    async fn get_usage_minutes(&self, user_id: &str) -> AppResult<Option<i64>>;

    /// Overwrite persisted trial minutes and bump `updated_at`
    async fn set_usage_minutes(&self, user_id: &str, minutes: i64) -> AppResult<()>;

    /// Full profile row for a user
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<Profile>>;

    /// Profile linked to a payment-processor customer
    async fn find_profile_by_customer(&self, customer_id: &str) -> AppResult<Option<Profile>>;

    /// Link a customer to a user and mark the subscription active
    async fn activate_subscription(&self, user_id: &str, customer_id: &str) -> AppResult<()>;

    /// Set the subscription status of a user
    async fn set_subscription_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<()>;
}
