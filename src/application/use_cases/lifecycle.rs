use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::{BillingEvent, BillingProviderPort};
use crate::application::use_cases::plan_catalog::PlanCatalogUseCases;
use crate::application::use_cases::user::UserRepo;
use crate::domain::entities::plan::Plan;
use crate::domain::entities::subscription::{Subscription, SubscriptionStatus};

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub user_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub trial_end: Option<NaiveDateTime>,
    pub polar_subscription_id: Option<String>,
}

/// Field set written on a "subscription created/renewed" billing event.
#[derive(Debug, Clone)]
pub struct BillingUpsert {
    pub plan_id: Uuid,
    pub polar_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub trial_end: Option<NaiveDateTime>,
    pub last_webhook_received: NaiveDateTime,
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;

    async fn get_by_polar_subscription_id(
        &self,
        polar_subscription_id: &str,
    ) -> AppResult<Option<Subscription>>;

    /// Insert unless the user already has a row (the user column is
    /// unique); returns the canonical row either way.
    async fn create_if_absent(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription>;

    /// Apply a billing-provider upsert atomically to the user's row,
    /// creating it if the user has none yet.
    async fn upsert_from_billing(
        &self,
        user_id: Uuid,
        update: &BillingUpsert,
    ) -> AppResult<Subscription>;

    /// Atomic cancellation write: status ← canceled, is_active ← false,
    /// and optionally canceled_at for the user-initiated path.
    async fn mark_canceled(&self, id: Uuid, canceled_at: Option<NaiveDateTime>) -> AppResult<()>;

    /// Conditional grace-period reversion keyed on the pre-reversion state:
    /// only a row that is still canceled with a lapsed period is migrated
    /// to the free plan. Returns whether this call performed the write, so
    /// racing checks collapse to one effect.
    async fn revert_to_free_if_expired(
        &self,
        id: Uuid,
        free_plan_id: Uuid,
        now: NaiveDateTime,
    ) -> AppResult<bool>;
}

// ============================================================================
// View Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub subscription: Subscription,
    pub plan: Option<Plan>,
    pub effective_status: SubscriptionStatus,
}

// ============================================================================
// Use Cases
// ============================================================================

/// Keeps a subscription row consistent with the clock and with billing
/// events, and materializes the effective status everything else gates on.
#[derive(Clone)]
pub struct SubscriptionLifecycleUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    catalog: PlanCatalogUseCases,
    user_repo: Arc<dyn UserRepo>,
    billing: Arc<dyn BillingProviderPort>,
}

impl SubscriptionLifecycleUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        catalog: PlanCatalogUseCases,
        user_repo: Arc<dyn UserRepo>,
        billing: Arc<dyn BillingProviderPort>,
    ) -> Self {
        Self { subscription_repo, catalog, user_repo, billing }
    }

    /// Every new user starts on the free plan: active, period open-ended.
    /// The user row is mirrored first so the subscription has something to
    /// reference and billing events can later resolve the email.
    #[instrument(skip(self, email))]
    pub async fn provision_free_subscription(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> AppResult<Subscription> {
        self.user_repo.upsert(user_id, email).await?;

        let free_plan = self.catalog.get_or_create_free_plan().await?;
        self.subscription_repo
            .create_if_absent(&CreateSubscriptionInput {
                user_id,
                plan_id: Some(free_plan.id),
                status: SubscriptionStatus::Active,
                is_active: true,
                current_period_start: Some(Utc::now().naive_utc()),
                current_period_end: None,
                trial_end: None,
                polar_subscription_id: None,
            })
            .await
    }

    /// The subscription as callers should see it: the grace-period
    /// reversion is resolved lazily here before the row is returned.
    #[instrument(skip(self))]
    pub async fn current_subscription(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<SubscriptionView>> {
        let Some(mut subscription) = self.subscription_repo.get_by_user(user_id).await? else {
            return Ok(None);
        };

        let now = Utc::now().naive_utc();
        if subscription.grace_period_expired(now) {
            let free_plan = self.catalog.get_or_create_free_plan().await?;
            let reverted = self
                .subscription_repo
                .revert_to_free_if_expired(subscription.id, free_plan.id, now)
                .await?;
            if reverted {
                info!(%user_id, "Reverted expired canceled subscription to free plan");
            }
            subscription = self
                .subscription_repo
                .get_by_user(user_id)
                .await?
                .ok_or(AppError::NotFound)?;
        }

        let plan = match subscription.plan_id {
            Some(plan_id) => self.catalog.get(plan_id).await?,
            None => None,
        };
        let effective_status = subscription.effective_status(now);

        Ok(Some(SubscriptionView { subscription, plan, effective_status }))
    }

    /// Applies an authenticated, parsed billing event. Events referencing
    /// an unknown user or plan are logged and dropped with no partial
    /// state change; unknown event types are ignored.
    #[instrument(skip(self, event), fields(event = ?event_kind(&event)))]
    pub async fn apply_billing_event(&self, event: BillingEvent) -> AppResult<()> {
        match event {
            BillingEvent::SubscriptionCreated {
                subscription_id,
                customer_email,
                plan_id,
                current_period_start,
                current_period_end,
                trial_end,
            } => {
                let Some(user) = self.user_repo.get_by_email(&customer_email).await? else {
                    warn!(email = %customer_email, "Billing event for unknown user, dropping");
                    return Ok(());
                };
                let Some(plan) = self.catalog.get_by_polar_plan_id(&plan_id).await? else {
                    warn!(plan_id = %plan_id, "Billing event for unknown plan, dropping");
                    return Ok(());
                };

                let status = if trial_end.is_some() {
                    SubscriptionStatus::Trialing
                } else {
                    SubscriptionStatus::Active
                };

                self.subscription_repo
                    .upsert_from_billing(
                        user.id,
                        &BillingUpsert {
                            plan_id: plan.id,
                            polar_subscription_id: subscription_id.clone(),
                            status,
                            current_period_start,
                            current_period_end,
                            trial_end,
                            last_webhook_received: Utc::now().naive_utc(),
                        },
                    )
                    .await?;

                // Keep the provider's view of the plan in sync; a failure
                // here must not undo the local state we just committed.
                if let Some(polar_plan_id) = plan.polar_plan_id.as_deref() {
                    if let Err(err) = self
                        .billing
                        .update_subscription(&subscription_id, polar_plan_id)
                        .await
                    {
                        warn!(error = %err, "Failed to sync plan with billing provider");
                    }
                }

                info!(user_id = %user.id, plan = %plan.name, "Applied subscription upsert");
                Ok(())
            }
            BillingEvent::SubscriptionCanceled { subscription_id, customer_email } => {
                let subscription = match self
                    .subscription_repo
                    .get_by_polar_subscription_id(&subscription_id)
                    .await?
                {
                    Some(sub) => Some(sub),
                    None => match self.user_repo.get_by_email(&customer_email).await? {
                        Some(user) => self.subscription_repo.get_by_user(user.id).await?,
                        None => None,
                    },
                };

                let Some(subscription) = subscription else {
                    warn!(
                        subscription_id = %subscription_id,
                        "Cancellation event for unknown subscription, dropping"
                    );
                    return Ok(());
                };

                self.subscription_repo
                    .mark_canceled(subscription.id, None)
                    .await?;
                info!(user_id = %subscription.user_id, "Applied subscription cancellation");
                Ok(())
            }
            BillingEvent::Unknown { event_type } => {
                info!(event_type = %event_type, "Ignoring unhandled billing event type");
                Ok(())
            }
        }
    }

    /// User-initiated cancellation: cancel at the provider first, then
    /// stamp the local row with canceled_at = now.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid) -> AppResult<()> {
        let subscription = self
            .subscription_repo
            .get_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let polar_subscription_id = subscription
            .polar_subscription_id
            .as_deref()
            .ok_or_else(|| {
                AppError::InvalidInput("No billing subscription to cancel".to_string())
            })?;

        self.billing.cancel_subscription(polar_subscription_id).await?;

        self.subscription_repo
            .mark_canceled(subscription.id, Some(Utc::now().naive_utc()))
            .await?;
        info!(%user_id, "Canceled subscription");
        Ok(())
    }
}

fn event_kind(event: &BillingEvent) -> &'static str {
    match event {
        BillingEvent::SubscriptionCreated { .. } => "subscription.created",
        BillingEvent::SubscriptionCanceled { .. } => "subscription.canceled",
        BillingEvent::Unknown { .. } => "unknown",
    }
}
