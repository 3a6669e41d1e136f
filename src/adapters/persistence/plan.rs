use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan_catalog::PlanRepo,
    domain::entities::plan::Plan,
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> Plan {
    Plan {
        id: row.get("id"),
        name: row.get("name"),
        billing_period: row.get("billing_period"),
        is_free: row.get("is_free"),
        price_cents: row.get("price_cents"),
        description: row.get("description"),
        polar_plan_id: row.get("polar_plan_id"),
        pdf_uploads_per_month: row.get("pdf_uploads_per_month"),
        pdf_max_size_mb: row.get("pdf_max_size_mb"),
        pdf_max_pages: row.get("pdf_max_pages"),
        audio_uploads_per_month: row.get("audio_uploads_per_month"),
        audio_max_size_mb: row.get("audio_max_size_mb"),
        audio_max_length_min: row.get("audio_max_length_min"),
        youtube_links_per_month: row.get("youtube_links_per_month"),
        youtube_max_length_min: row.get("youtube_max_length_min"),
        quizzes_per_month: row.get("quizzes_per_month"),
        summary_regenerations_per_file: row.get("summary_regenerations_per_file"),
        chatbot_messages_per_file: row.get("chatbot_messages_per_file"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, name, billing_period, is_free, price_cents, description, polar_plan_id,
    pdf_uploads_per_month, pdf_max_size_mb, pdf_max_pages,
    audio_uploads_per_month, audio_max_size_mb, audio_max_length_min,
    youtube_links_per_month, youtube_max_length_min,
    quizzes_per_month, summary_regenerations_per_file, chatbot_messages_per_file,
    created_at, updated_at
"#;

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE name = $1",
            SELECT_COLS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn get_by_polar_plan_id(&self, polar_plan_id: &str) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE polar_plan_id = $1",
            SELECT_COLS
        ))
        .bind(polar_plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list_by_price(&self) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans ORDER BY price_cents ASC, name ASC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }

    async fn save(&self, plan: &Plan) -> AppResult<Plan> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_plans (
                id, name, billing_period, is_free, price_cents, description, polar_plan_id,
                pdf_uploads_per_month, pdf_max_size_mb, pdf_max_pages,
                audio_uploads_per_month, audio_max_size_mb, audio_max_length_min,
                youtube_links_per_month, youtube_max_length_min,
                quizzes_per_month, summary_regenerations_per_file, chatbot_messages_per_file
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                billing_period = EXCLUDED.billing_period,
                is_free = EXCLUDED.is_free,
                price_cents = EXCLUDED.price_cents,
                description = EXCLUDED.description,
                polar_plan_id = EXCLUDED.polar_plan_id,
                pdf_uploads_per_month = EXCLUDED.pdf_uploads_per_month,
                pdf_max_size_mb = EXCLUDED.pdf_max_size_mb,
                pdf_max_pages = EXCLUDED.pdf_max_pages,
                audio_uploads_per_month = EXCLUDED.audio_uploads_per_month,
                audio_max_size_mb = EXCLUDED.audio_max_size_mb,
                audio_max_length_min = EXCLUDED.audio_max_length_min,
                youtube_links_per_month = EXCLUDED.youtube_links_per_month,
                youtube_max_length_min = EXCLUDED.youtube_max_length_min,
                quizzes_per_month = EXCLUDED.quizzes_per_month,
                summary_regenerations_per_file = EXCLUDED.summary_regenerations_per_file,
                chatbot_messages_per_file = EXCLUDED.chatbot_messages_per_file,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.billing_period)
        .bind(plan.is_free)
        .bind(plan.price_cents)
        .bind(&plan.description)
        .bind(&plan.polar_plan_id)
        .bind(plan.pdf_uploads_per_month)
        .bind(plan.pdf_max_size_mb)
        .bind(plan.pdf_max_pages)
        .bind(plan.audio_uploads_per_month)
        .bind(plan.audio_max_size_mb)
        .bind(plan.audio_max_length_min)
        .bind(plan.youtube_links_per_month)
        .bind(plan.youtube_max_length_min)
        .bind(plan.quizzes_per_month)
        .bind(plan.summary_regenerations_per_file)
        .bind(plan.chatbot_messages_per_file)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }

    async fn insert_if_absent(&self, plan: &Plan) -> AppResult<()> {
        // Name is unique; a racing creator simply hits DO NOTHING.
        sqlx::query(
            r#"
            INSERT INTO subscription_plans (
                id, name, billing_period, is_free, price_cents, description, polar_plan_id,
                pdf_uploads_per_month, pdf_max_size_mb, pdf_max_pages,
                audio_uploads_per_month, audio_max_size_mb, audio_max_length_min,
                youtube_links_per_month, youtube_max_length_min,
                quizzes_per_month, summary_regenerations_per_file, chatbot_messages_per_file
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.billing_period)
        .bind(plan.is_free)
        .bind(plan.price_cents)
        .bind(&plan.description)
        .bind(&plan.polar_plan_id)
        .bind(plan.pdf_uploads_per_month)
        .bind(plan.pdf_max_size_mb)
        .bind(plan.pdf_max_pages)
        .bind(plan.audio_uploads_per_month)
        .bind(plan.audio_max_size_mb)
        .bind(plan.audio_max_length_min)
        .bind(plan.youtube_links_per_month)
        .bind(plan.youtube_max_length_min)
        .bind(plan.quizzes_per_month)
        .bind(plan.summary_regenerations_per_file)
        .bind(plan.chatbot_messages_per_file)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
