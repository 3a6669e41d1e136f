use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::content::{
        ChatMessageProfile, ContentRepo, FileProfile, NewFileInput, QuizProfile, SummaryProfile,
    },
    domain::entities::content::ChatRole,
};

fn row_to_file(row: &sqlx::postgres::PgRow) -> FileProfile {
    FileProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: row.get("kind"),
        title: row.get("title"),
        size_mb: row.get("size_mb"),
        pages: row.get("pages"),
        duration_min: row.get("duration_min"),
        video_url: row.get("video_url"),
        source_text: row.get("source_text"),
        created_at: row.get("created_at"),
    }
}

fn row_to_summary(row: &sqlx::postgres::PgRow) -> SummaryProfile {
    SummaryProfile {
        id: row.get("id"),
        file_id: row.get("file_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

fn row_to_chat_message(row: &sqlx::postgres::PgRow) -> ChatMessageProfile {
    ChatMessageProfile {
        id: row.get("id"),
        file_id: row.get("file_id"),
        role: row.get("role"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

const FILE_COLS: &str =
    "id, user_id, kind, title, size_mb, pages, duration_min, video_url, source_text, created_at";

#[async_trait]
impl ContentRepo for PostgresPersistence {
    async fn insert_file(&self, user_id: Uuid, input: &NewFileInput) -> AppResult<FileProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO files (user_id, kind, title, size_mb, pages, duration_min, video_url, source_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            FILE_COLS
        ))
        .bind(user_id)
        .bind(input.kind)
        .bind(&input.title)
        .bind(input.size_mb)
        .bind(input.pages)
        .bind(input.duration_min)
        .bind(&input.video_url)
        .bind(&input.source_text)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_file(&row))
    }

    async fn get_file(&self, user_id: Uuid, file_id: Uuid) -> AppResult<Option<FileProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM files WHERE id = $1 AND user_id = $2",
            FILE_COLS
        ))
        .bind(file_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_file))
    }

    async fn list_files(&self, user_id: Uuid) -> AppResult<Vec<FileProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM files WHERE user_id = $1 ORDER BY created_at DESC",
            FILE_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_file).collect())
    }

    async fn insert_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        text: &str,
    ) -> AppResult<SummaryProfile> {
        let row = sqlx::query(
            r#"
            INSERT INTO summaries (user_id, file_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, file_id, text, created_at
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_summary(&row))
    }

    async fn latest_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Option<SummaryProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, file_id, text, created_at
            FROM summaries
            WHERE user_id = $1 AND file_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_summary))
    }

    async fn insert_quiz(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        questions: &serde_json::Value,
    ) -> AppResult<QuizProfile> {
        let row = sqlx::query(
            r#"
            INSERT INTO quizzes (user_id, file_id, questions)
            VALUES ($1, $2, $3)
            RETURNING id, file_id, questions, created_at
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .bind(questions)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(QuizProfile {
            id: row.get("id"),
            file_id: row.get("file_id"),
            questions: row.get("questions"),
            created_at: row.get("created_at"),
        })
    }

    async fn insert_chat_message(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> AppResult<ChatMessageProfile> {
        let row = sqlx::query(
            r#"
            INSERT INTO chat_messages (user_id, file_id, role, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_id, role, content, created_at
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_chat_message(&row))
    }

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<ChatMessageProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_id, role, content, created_at
            FROM chat_messages
            WHERE user_id = $1 AND file_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_chat_message).collect())
    }
}
