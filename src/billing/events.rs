//! Stripe event payloads
//!
//! Only the fields the handler reads are typed; the rest of `data.object`
//! stays as raw JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Event mapped to what the handler acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        user_id: Option<String>,
        customer_id: Option<String>,
    },
    SubscriptionUpdated {
        customer_id: Option<String>,
        status: Option<String>,
    },
    SubscriptionDeleted {
        customer_id: Option<String>,
    },
    Other(String),
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))
    }

    pub fn classify(&self) -> BillingEvent {
        let object = &self.data.object;
        match self.event_type.as_str() {
            CHECKOUT_COMPLETED => BillingEvent::CheckoutCompleted {
                user_id: object
                    .pointer("/metadata/user_id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
                customer_id: customer_id(object),
            },
            SUBSCRIPTION_UPDATED => BillingEvent::SubscriptionUpdated {
                customer_id: customer_id(object),
                status: object
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            SUBSCRIPTION_DELETED => BillingEvent::SubscriptionDeleted {
                customer_id: customer_id(object),
            },
            other => BillingEvent::Other(other.to_string()),
        }
    }
}

/// `customer` is either an id string or an expanded customer object
fn customer_id(object: &Value) -> Option<String> {
    match object.get("customer")? {
        Value::String(id) => Some(id.clone()),
        Value::Object(customer) => customer.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
