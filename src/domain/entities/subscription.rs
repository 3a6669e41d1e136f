use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Paused,
    Canceled,
}

/// Per-user subscription state, one row per user. The stored `status` and
/// `is_active` can disagree transiently (a canceled subscription keeps
/// `is_active = true` until its grace period lapses); callers gate behavior
/// on [`Subscription::effective_status`], never the raw field.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    /// None after plan deletion; every metered action is denied until the
    /// free plan is re-provisioned.
    pub plan_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub current_period_start: Option<NaiveDateTime>,
    /// None means the period never expires (free tier).
    pub current_period_end: Option<NaiveDateTime>,
    pub trial_end: Option<NaiveDateTime>,
    pub polar_subscription_id: Option<String>,
    pub canceled_at: Option<NaiveDateTime>,
    pub pause_collection: bool,
    pub last_webhook_received: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Subscription {
    pub fn is_in_trial(&self, now: NaiveDateTime) -> bool {
        self.status == SubscriptionStatus::Trialing
            && self.trial_end.map(|end| end > now).unwrap_or(false)
    }

    /// Derives the real subscription state from the stored fields and the
    /// clock, in priority order: cancellation wins, then an unexpired trial,
    /// then a lapsed billing period, then whatever is stored.
    pub fn effective_status(&self, now: NaiveDateTime) -> SubscriptionStatus {
        if self.status == SubscriptionStatus::Canceled || !self.is_active {
            return SubscriptionStatus::Canceled;
        }
        if self.is_in_trial(now) {
            return SubscriptionStatus::Trialing;
        }
        if let Some(period_end) = self.current_period_end {
            if period_end < now {
                return SubscriptionStatus::PastDue;
            }
        }
        self.status
    }

    /// A canceled subscription whose paid period has run out is due for the
    /// automatic migration back to the free plan.
    pub fn grace_period_expired(&self, now: NaiveDateTime) -> bool {
        self.status == SubscriptionStatus::Canceled
            && self.current_period_end.map(|end| now > end).unwrap_or(false)
    }
}
