//! In-memory profile store for testing
//!
//! Stores profiles in a HashMap so session, meter and webhook flows can be
//! exercised without a Supabase instance. Writes can be made to fail on
//! demand to simulate a store outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    store::{Profile, ProfileStore, SubscriptionStatus},
};

/// In-memory profile store
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    usage_writes: AtomicUsize,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile row
    pub fn insert(&self, profile: Profile) {
        let mut profiles = self.profiles.write().unwrap();
        profiles.insert(profile.id.clone(), profile);
    }

    /// Insert a fresh inactive profile with the given trial minutes
    pub fn insert_user(&self, user_id: &str, minutes_used: i64) {
        self.insert(Profile {
            id: user_id.to_string(),
            subscription_status: SubscriptionStatus::Inactive,
            stripe_customer_id: None,
            free_trial_minutes_used: minutes_used,
            subscription_started_at: None,
            updated_at: None,
        });
    }

    /// Snapshot of a stored profile
    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.read().unwrap().get(user_id).cloned()
    }

    /// Make every read fail with an upstream error
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with an upstream error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful usage writes so far
    pub fn usage_write_count(&self) -> usize {
        self.usage_writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("simulated read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("simulated write failure".to_string()));
        }
        Ok(())
    }

    fn update<F>(&self, user_id: &str, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Profile),
    {
        self.check_write()?;
        let mut profiles = self.profiles.write().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", user_id)))?;
        apply(profile);
        profile.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_usage_minutes(&self, user_id: &str) -> AppResult<Option<i64>> {
        self.check_read()?;
        Ok(self
            .profiles
            .read()
            .unwrap()
            .get(user_id)
            .map(|p| p.free_trial_minutes_used))
    }

    async fn set_usage_minutes(&self, user_id: &str, minutes: i64) -> AppResult<()> {
        self.update(user_id, |p| p.free_trial_minutes_used = minutes)?;
        self.usage_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> AppResult<Option<Profile>> {
        self.check_read()?;
        Ok(self.profile(user_id))
    }

    async fn find_profile_by_customer(&self, customer_id: &str) -> AppResult<Option<Profile>> {
        self.check_read()?;
        Ok(self
            .profiles
            .read()
            .unwrap()
            .values()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn activate_subscription(&self, user_id: &str, customer_id: &str) -> AppResult<()> {
        self.update(user_id, |p| {
            p.stripe_customer_id = Some(customer_id.to_string());
            p.subscription_status = SubscriptionStatus::Active;
            p.subscription_started_at = Some(Utc::now());
        })
    }

    async fn set_subscription_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<()> {
        self.update(user_id, |p| p.subscription_status = status)
    }
}
