use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::app_error::AppResult;

/// A billing-provider notification after transport-level authentication and
/// parsing. Anything the provider sends that we do not act on arrives as
/// [`BillingEvent::Unknown`] and is logged, never fatal.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    SubscriptionCreated {
        subscription_id: String,
        customer_email: String,
        plan_id: String,
        current_period_start: Option<NaiveDateTime>,
        current_period_end: Option<NaiveDateTime>,
        trial_end: Option<NaiveDateTime>,
    },
    SubscriptionCanceled {
        subscription_id: String,
        customer_email: String,
    },
    Unknown {
        event_type: String,
    },
}

/// Outbound calls to the payment provider. Constructor-injected so the
/// lifecycle core is testable without any network dependency.
#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    /// Cancel the remote subscription (user-initiated cancellation path).
    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()>;

    /// Sync the remote subscription's plan after an upsert.
    async fn update_subscription(&self, subscription_id: &str, plan_id: &str) -> AppResult<()>;

    /// Check the webhook body against the provider's HMAC signature.
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;
}
