//! Supabase API client
//!
//! HTTP client for Supabase auth (`/auth/v1`) and the PostgREST `profiles`
//! table (`/rest/v1/profiles`).

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    store::{Profile, ProfileStore, SubscriptionStatus},
    supabase::models::{AuthUser, IdRow, SubscriptionUpdate, UsageRow, UsageUpdate},
};

const PROFILE_COLUMNS: &str =
    "id,subscription_status,stripe_customer_id,free_trial_minutes_used,subscription_started_at,updated_at";

/// Supabase API client
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    /// Create a new Supabase client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    /// Validate a user JWT and return the authenticated user
    #[instrument(skip(self, jwt), fields(jwt_len = jwt.len()))]
    pub async fn validate_jwt(&self, jwt: &str) -> AppResult<AuthUser> {
        let url = format!("{}/auth/v1/user", self.base_url);

        debug!(url = %url, "Validating JWT with Supabase");

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.service_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", jwt))?);

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Supabase");
                e
            })?;

        let status = response.status();
        debug!(status = %status, "Supabase JWT validation response status");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                warn!(status = %status, body = %text, "JWT validation failed - unauthorized");
                return Err(AppError::InvalidToken);
            }

            error!(status = %status, body = %text, "Supabase JWT validation request failed");
            return Err(AppError::UpstreamError(format!(
                "Supabase auth error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        let user: AuthUser = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse Supabase user response");
            AppError::UpstreamError(format!("Failed to parse Supabase response: {}", e))
        })?;

        debug!(user_id = %user.id, "JWT validated successfully");
        Ok(user)
    }

    /// Select rows from `profiles` where `column = value`
    async fn select_profiles<T: DeserializeOwned>(
        &self,
        column: &str,
        value: &str,
        select: &str,
    ) -> AppResult<Vec<T>> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let filter = format!("eq.{}", value);

        let response = self
            .client
            .get(&url)
            .headers(self.service_headers()?)
            .query(&[(column, filter.as_str()), ("select", select)])
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, column = %column, "Supabase profile select status");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Supabase profile select failed");
            return Err(AppError::UpstreamError(format!(
                "Supabase API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %body, "Failed to parse Supabase profile rows");
            AppError::UpstreamError(format!("Failed to parse Supabase response: {}", e))
        })
    }

    /// Patch the profile row of a user, failing if no row matched
    async fn patch_profile<B: Serialize + ?Sized>(&self, user_id: &str, body: &B) -> AppResult<()> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let filter = format!("eq.{}", user_id);

        let mut headers = self.service_headers()?;
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let response = self
            .client
            .patch(&url)
            .headers(headers)
            .query(&[("id", filter.as_str()), ("select", "id")])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Supabase profile update status");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Supabase profile update failed");
            return Err(AppError::UpstreamError(format!(
                "Supabase API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        let rows: Vec<IdRow> = serde_json::from_str(&body).map_err(|e| {
            AppError::UpstreamError(format!("Failed to parse Supabase response: {}", e))
        })?;

        if rows.is_empty() {
            warn!(user_id = %user_id, "Profile update matched no rows");
            return Err(AppError::NotFound(format!("Profile not found: {}", user_id)));
        }

        Ok(())
    }

    /// Build headers with service-role authentication
    fn service_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.service_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.service_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid header value: {}", e)))
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_usage_minutes(&self, user_id: &str) -> AppResult<Option<i64>> {
        let rows: Vec<UsageRow> = self
            .select_profiles("id", user_id, "free_trial_minutes_used")
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.free_trial_minutes_used.unwrap_or(0)))
    }

    #[instrument(skip(self), fields(user_id = %user_id, minutes = minutes))]
    async fn set_usage_minutes(&self, user_id: &str, minutes: i64) -> AppResult<()> {
        let update = UsageUpdate {
            free_trial_minutes_used: minutes,
            updated_at: Utc::now(),
        };
        self.patch_profile(user_id, &update).await?;
        debug!("Saved trial usage");
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_profile(&self, user_id: &str) -> AppResult<Option<Profile>> {
        let rows: Vec<Profile> = self.select_profiles("id", user_id, PROFILE_COLUMNS).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn find_profile_by_customer(&self, customer_id: &str) -> AppResult<Option<Profile>> {
        let rows: Vec<Profile> = self
            .select_profiles("stripe_customer_id", customer_id, PROFILE_COLUMNS)
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self), fields(user_id = %user_id, customer_id = %customer_id))]
    async fn activate_subscription(&self, user_id: &str, customer_id: &str) -> AppResult<()> {
        let now = Utc::now();
        let update = SubscriptionUpdate {
            stripe_customer_id: Some(customer_id.to_string()),
            subscription_status: SubscriptionStatus::Active,
            subscription_started_at: Some(now),
            updated_at: now,
        };
        self.patch_profile(user_id, &update).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, status = status.as_str()))]
    async fn set_subscription_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<()> {
        let update = SubscriptionUpdate {
            stripe_customer_id: None,
            subscription_status: status,
            subscription_started_at: None,
            updated_at: Utc::now(),
        };
        self.patch_profile(user_id, &update).await
    }
}
