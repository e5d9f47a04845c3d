//! Stripe billing webhooks
//!
//! Signature verification, event parsing and the mapping from subscription
//! lifecycle events to profile updates.

pub mod events;
pub mod handler;
pub mod signature;

pub use events::{BillingEvent, WebhookEvent};
pub use handler::{handle_event, map_subscription_status, WebhookOutcome};
pub use signature::{verify_signature, SIGNATURE_HEADER};

#[cfg(any(test, feature = "test-utils"))]
pub use signature::sign_payload;
