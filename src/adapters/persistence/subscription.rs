use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::lifecycle::{BillingUpsert, CreateSubscriptionInput, SubscriptionRepo},
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        is_active: row.get("is_active"),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        trial_end: row.get("trial_end"),
        polar_subscription_id: row.get("polar_subscription_id"),
        canceled_at: row.get("canceled_at"),
        pause_collection: row.get("pause_collection"),
        last_webhook_received: row.get("last_webhook_received"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, status, is_active,
    current_period_start, current_period_end, trial_end,
    polar_subscription_id, canceled_at, pause_collection, last_webhook_received,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_by_polar_subscription_id(
        &self,
        polar_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE polar_subscription_id = $1",
            SELECT_COLS
        ))
        .bind(polar_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn create_if_absent(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        // user_id is unique; the losing side of a race reads back the row.
        sqlx::query(
            r#"
            INSERT INTO user_subscriptions (
                user_id, plan_id, status, is_active,
                current_period_start, current_period_end, trial_end, polar_subscription_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(input.user_id)
        .bind(input.plan_id)
        .bind(input.status)
        .bind(input.is_active)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .bind(input.trial_end)
        .bind(&input.polar_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        self.get_by_user(input.user_id)
            .await?
            .ok_or_else(|| AppError::Internal("subscription missing after insert".to_string()))
    }

    async fn upsert_from_billing(
        &self,
        user_id: Uuid,
        update: &BillingUpsert,
    ) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO user_subscriptions (
                user_id, plan_id, status, is_active,
                current_period_start, current_period_end, trial_end,
                polar_subscription_id, last_webhook_received
            )
            VALUES ($1, $2, $3, TRUE, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                status = EXCLUDED.status,
                is_active = TRUE,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                trial_end = EXCLUDED.trial_end,
                polar_subscription_id = EXCLUDED.polar_subscription_id,
                last_webhook_received = EXCLUDED.last_webhook_received,
                canceled_at = NULL,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(update.plan_id)
        .bind(update.status)
        .bind(update.current_period_start)
        .bind(update.current_period_end)
        .bind(update.trial_end)
        .bind(&update.polar_subscription_id)
        .bind(update.last_webhook_received)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn mark_canceled(&self, id: Uuid, canceled_at: Option<NaiveDateTime>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'canceled',
                is_active = FALSE,
                canceled_at = COALESCE($2, canceled_at),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(canceled_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn revert_to_free_if_expired(
        &self,
        id: Uuid,
        free_plan_id: Uuid,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        // The WHERE clause re-checks the pre-reversion state, so concurrent
        // callers produce exactly one write.
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET plan_id = $2,
                status = 'active',
                is_active = TRUE,
                current_period_start = $3,
                current_period_end = NULL,
                trial_end = NULL,
                polar_subscription_id = NULL,
                canceled_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'canceled'
              AND current_period_end IS NOT NULL
              AND current_period_end < $3
            "#,
        )
        .bind(id)
        .bind(free_plan_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
