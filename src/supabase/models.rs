//! Supabase data models
//!
//! Data structures for the auth and PostgREST endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SubscriptionStatus;

/// Authenticated user returned by `GET /auth/v1/user`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Row returned by the usage projection
#[derive(Debug, Clone, Deserialize)]
pub struct UsageRow {
    #[serde(default)]
    pub free_trial_minutes_used: Option<i64>,
}

/// Row returned by the id projection
#[derive(Debug, Clone, Deserialize)]
pub struct IdRow {
    pub id: String,
}

/// PATCH body for usage writes
#[derive(Debug, Clone, Serialize)]
pub struct UsageUpdate {
    pub free_trial_minutes_used: i64,
    pub updated_at: DateTime<Utc>,
}

/// PATCH body for subscription writes
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
