use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::entitlement::UsageLedger,
    domain::entities::content::FileKind,
};

/// Usage counts come straight off the content tables; there is no separate
/// counter to drift out of sync.
#[async_trait]
impl UsageLedger for PostgresPersistence {
    async fn count_uploads_since(
        &self,
        user_id: Uuid,
        kind: FileKind,
        since: NaiveDateTime,
    ) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM files WHERE user_id = $1 AND kind = $2 AND created_at >= $3",
        )
        .bind(user_id)
        .bind(kind)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.get("n"))
    }

    async fn count_quizzes_since(&self, user_id: Uuid, since: NaiveDateTime) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM quizzes WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.get("n"))
    }

    async fn summary_timestamps(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<NaiveDateTime>> {
        let rows = sqlx::query(
            r#"
            SELECT created_at FROM summaries
            WHERE user_id = $1 AND file_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(|r| r.get("created_at")).collect())
    }

    async fn count_chat_messages(&self, user_id: Uuid, file_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM chat_messages WHERE user_id = $1 AND file_id = $2",
        )
        .bind(user_id)
        .bind(file_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.get("n"))
    }
}
