//! Entity factories with override closures.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::plan::Plan;
use crate::domain::entities::subscription::{Subscription, SubscriptionStatus};

/// A plan seeded with the free-tier limits; override what the test cares
/// about.
pub fn test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let now = Utc::now().naive_utc();
    let mut plan = Plan::free_defaults();
    plan.created_at = Some(now);
    plan.updated_at = Some(now);
    overrides(&mut plan);
    plan
}

/// An active, open-ended subscription for `user_id` on `plan_id`.
pub fn test_subscription(
    user_id: Uuid,
    plan_id: Option<Uuid>,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let now = Utc::now().naive_utc();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan_id,
        status: SubscriptionStatus::Active,
        is_active: true,
        current_period_start: Some(now),
        current_period_end: None,
        trial_end: None,
        polar_subscription_id: None,
        canceled_at: None,
        pause_collection: false,
        last_webhook_received: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut subscription);
    subscription
}
