//! Subscription lifecycle handling
//!
//! Maps a verified Stripe event onto a profile update. Events that arrive
//! before the customer is linked are acknowledged without touching any row;
//! the later checkout event reconciles them.

use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    store::{ProfileStore, SubscriptionStatus},
};

use super::events::{BillingEvent, WebhookEvent};

/// What a handled event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Activated {
        user_id: String,
    },
    StatusChanged {
        user_id: String,
        status: SubscriptionStatus,
    },
    /// The customer has no profile yet
    CustomerNotFound {
        customer_id: String,
    },
    Ignored {
        event_type: String,
    },
}

impl WebhookOutcome {
    /// User whose profile changed
    pub fn affected_user(&self) -> Option<(&str, SubscriptionStatus)> {
        match self {
            WebhookOutcome::Activated { user_id } => {
                Some((user_id.as_str(), SubscriptionStatus::Active))
            }
            WebhookOutcome::StatusChanged { user_id, status } => Some((user_id.as_str(), *status)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Activated { .. } => "activated",
            WebhookOutcome::StatusChanged { .. } => "status_changed",
            WebhookOutcome::CustomerNotFound { .. } => "customer_not_found",
            WebhookOutcome::Ignored { .. } => "ignored",
        }
    }

    /// Acknowledgement body returned to Stripe
    pub fn to_body(&self) -> Value {
        match self {
            WebhookOutcome::CustomerNotFound { .. } => json!({
                "received": true,
                "message": "Customer not yet in database",
            }),
            _ => json!({ "received": true }),
        }
    }
}

/// Map a subscription status reported by Stripe to the profile status
pub fn map_subscription_status(status: Option<&str>) -> SubscriptionStatus {
    match status {
        Some("active") => SubscriptionStatus::Active,
        _ => SubscriptionStatus::Inactive,
    }
}

fn database_error(e: AppError) -> AppError {
    error!(error = %e, "Profile update from webhook failed");
    AppError::DatabaseError("Database update failed".to_string())
}

/// Apply a verified webhook event to the profile store
#[instrument(skip(store, event), fields(event_type = %event.event_type, event_id = ?event.id))]
pub async fn handle_event(store: &dyn ProfileStore, event: &WebhookEvent) -> AppResult<WebhookOutcome> {
    let outcome = match event.classify() {
        BillingEvent::CheckoutCompleted {
            user_id,
            customer_id,
        } => {
            let Some(user_id) = user_id else {
                error!("No user_id in checkout session metadata");
                return Err(AppError::BadRequest("No user_id found".to_string()));
            };
            let Some(customer_id) = customer_id else {
                error!(user_id = %user_id, "No customer in checkout session");
                return Err(AppError::BadRequest("No customer found".to_string()));
            };

            store
                .activate_subscription(&user_id, &customer_id)
                .await
                .map_err(database_error)?;
            info!(user_id = %user_id, customer_id = %customer_id, "Subscription activated");
            WebhookOutcome::Activated { user_id }
        }
        BillingEvent::SubscriptionUpdated {
            customer_id,
            status,
        } => {
            let status = map_subscription_status(status.as_deref());
            update_by_customer(store, customer_id, status).await?
        }
        BillingEvent::SubscriptionDeleted { customer_id } => {
            update_by_customer(store, customer_id, SubscriptionStatus::Inactive).await?
        }
        BillingEvent::Other(event_type) => {
            info!(event_type = %event_type, "Unhandled webhook event type");
            WebhookOutcome::Ignored { event_type }
        }
    };

    metrics::record_event(&event.event_type, outcome.as_str());
    Ok(outcome)
}

async fn update_by_customer(
    store: &dyn ProfileStore,
    customer_id: Option<String>,
    status: SubscriptionStatus,
) -> AppResult<WebhookOutcome> {
    let Some(customer_id) = customer_id else {
        return Err(AppError::BadRequest("No customer found".to_string()));
    };

    let profile = store
        .find_profile_by_customer(&customer_id)
        .await
        .map_err(database_error)?;

    let Some(profile) = profile else {
        warn!(
            customer_id = %customer_id,
            "No profile for customer yet, checkout completion may still be pending"
        );
        return Ok(WebhookOutcome::CustomerNotFound { customer_id });
    };

    store
        .set_subscription_status(&profile.id, status)
        .await
        .map_err(database_error)?;
    info!(user_id = %profile.id, status = status.as_str(), "Subscription status updated");

    Ok(WebhookOutcome::StatusChanged {
        user_id: profile.id,
        status,
    })
}

/// Metrics for webhook processing
pub mod metrics {
    use metrics::counter;

    /// Record a handled webhook event
    pub fn record_event(event_type: &str, result: &'static str) {
        counter!(
            "cartomante_webhook_events_total",
            "type" => event_type.to_string(),
            "result" => result
        )
        .increment(1);
    }
}
