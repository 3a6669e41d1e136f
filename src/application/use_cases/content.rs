use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::content_ai::{ChatTurn, ContentIntelligence, TranscriptFetcher};
use crate::application::use_cases::entitlement::{
    EntitlementDecision, EntitlementUseCases, UploadMetadata,
};
use crate::domain::entities::content::{ChatRole, FileKind};

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: FileKind,
    pub title: String,
    pub size_mb: Option<f64>,
    pub pages: Option<i32>,
    pub duration_min: Option<f64>,
    pub video_url: Option<String>,
    #[serde(skip)]
    pub source_text: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryProfile {
    pub id: Uuid,
    pub file_id: Uuid,
    pub text: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizProfile {
    pub id: Uuid,
    pub file_id: Uuid,
    pub questions: serde_json::Value,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageProfile {
    pub id: Uuid,
    pub file_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewFileInput {
    pub kind: FileKind,
    pub title: String,
    pub size_mb: Option<f64>,
    pub pages: Option<i32>,
    pub duration_min: Option<f64>,
    pub video_url: Option<String>,
    pub source_text: String,
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn insert_file(&self, user_id: Uuid, input: &NewFileInput) -> AppResult<FileProfile>;

    /// Scoped to the owner; another user's file id reads as absent.
    async fn get_file(&self, user_id: Uuid, file_id: Uuid) -> AppResult<Option<FileProfile>>;

    async fn list_files(&self, user_id: Uuid) -> AppResult<Vec<FileProfile>>;

    async fn insert_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        text: &str,
    ) -> AppResult<SummaryProfile>;

    async fn latest_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Option<SummaryProfile>>;

    async fn insert_quiz(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        questions: &serde_json::Value,
    ) -> AppResult<QuizProfile>;

    async fn insert_chat_message(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> AppResult<ChatMessageProfile>;

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<ChatMessageProfile>>;
}

// ============================================================================
// Gated Results
// ============================================================================

/// Outcome of a metered operation: either the produced value or the denial
/// that stopped it. Denials are ordinary values here, not errors; the HTTP
/// layer turns them into 403 responses.
#[derive(Debug, Clone)]
pub enum Gated<T> {
    Allowed(T),
    Denied(EntitlementDecision),
}

impl<T> Gated<T> {
    pub fn denied(&self) -> Option<&EntitlementDecision> {
        match self {
            Gated::Allowed(_) => None,
            Gated::Denied(decision) => Some(decision),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub question: ChatMessageProfile,
    pub answer: ChatMessageProfile,
}

// ============================================================================
// Use Cases
// ============================================================================

/// The metered content flows. Every flow runs its entitlement check first
/// and records usage only after an allow, so a denial leaves no trace in
/// the ledger.
#[derive(Clone)]
pub struct ContentUseCases {
    content_repo: Arc<dyn ContentRepo>,
    entitlement: EntitlementUseCases,
    intelligence: Arc<dyn ContentIntelligence>,
    transcripts: Arc<dyn TranscriptFetcher>,
}

impl ContentUseCases {
    pub fn new(
        content_repo: Arc<dyn ContentRepo>,
        entitlement: EntitlementUseCases,
        intelligence: Arc<dyn ContentIntelligence>,
        transcripts: Arc<dyn TranscriptFetcher>,
    ) -> Self {
        Self { content_repo, entitlement, intelligence, transcripts }
    }

    pub async fn list_files(&self, user_id: Uuid) -> AppResult<Vec<FileProfile>> {
        self.content_repo.list_files(user_id).await
    }

    pub async fn get_file(&self, user_id: Uuid, file_id: Uuid) -> AppResult<FileProfile> {
        self.content_repo
            .get_file(user_id, file_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Register an uploaded PDF or audio file.
    #[instrument(skip(self, input), fields(kind = %input.kind.as_str()))]
    pub async fn register_upload(
        &self,
        user_id: Uuid,
        input: NewFileInput,
    ) -> AppResult<Gated<FileProfile>> {
        if input.kind == FileKind::Youtube {
            return Err(AppError::InvalidInput(
                "YouTube links go through link registration".to_string(),
            ));
        }

        let decision = self
            .entitlement
            .check_upload(
                user_id,
                input.kind,
                UploadMetadata {
                    size_mb: input.size_mb,
                    duration_min: input.duration_min,
                    pages: input.pages,
                },
            )
            .await?;
        if !decision.allowed {
            return Ok(Gated::Denied(decision));
        }

        let file = self.content_repo.insert_file(user_id, &input).await?;
        info!(file_id = %file.id, "Registered upload");
        Ok(Gated::Allowed(file))
    }

    /// Register a YouTube link. The transcript is fetched first so the
    /// duration ceiling can be checked before anything is stored; a denial
    /// discards the transcript.
    #[instrument(skip(self))]
    pub async fn register_youtube_link(
        &self,
        user_id: Uuid,
        video_url: &str,
    ) -> AppResult<Gated<FileProfile>> {
        let transcript = self.transcripts.youtube_transcript(video_url).await?;

        let decision = self
            .entitlement
            .check_upload(
                user_id,
                FileKind::Youtube,
                UploadMetadata {
                    duration_min: Some(transcript.duration_min),
                    ..Default::default()
                },
            )
            .await?;
        if !decision.allowed {
            return Ok(Gated::Denied(decision));
        }

        let file = self
            .content_repo
            .insert_file(
                user_id,
                &NewFileInput {
                    kind: FileKind::Youtube,
                    title: transcript.title,
                    size_mb: None,
                    pages: None,
                    duration_min: Some(transcript.duration_min),
                    video_url: Some(video_url.to_string()),
                    source_text: transcript.text,
                },
            )
            .await?;
        info!(file_id = %file.id, "Registered YouTube link");
        Ok(Gated::Allowed(file))
    }

    /// Generate the initial summary for a file. Unmetered; returns the
    /// existing summary unchanged if one was already generated.
    #[instrument(skip(self))]
    pub async fn create_summary(&self, user_id: Uuid, file_id: Uuid) -> AppResult<SummaryProfile> {
        let file = self.get_file(user_id, file_id).await?;

        if let Some(existing) = self.content_repo.latest_summary(user_id, file_id).await? {
            return Ok(existing);
        }

        let text = self.intelligence.summarize(&file.source_text).await?;
        self.content_repo.insert_summary(user_id, file_id, &text).await
    }

    /// Regenerate a file's summary, subject to the per-file allowance.
    #[instrument(skip(self))]
    pub async fn regenerate_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Gated<SummaryProfile>> {
        let file = self.get_file(user_id, file_id).await?;

        let decision = self
            .entitlement
            .check_summary_regeneration(user_id, file_id)
            .await?;
        if !decision.allowed {
            return Ok(Gated::Denied(decision));
        }

        let text = self.intelligence.summarize(&file.source_text).await?;
        let summary = self.content_repo.insert_summary(user_id, file_id, &text).await?;
        Ok(Gated::Allowed(summary))
    }

    /// Generate and store a quiz for a file, subject to the monthly quota.
    #[instrument(skip(self))]
    pub async fn create_quiz(&self, user_id: Uuid, file_id: Uuid) -> AppResult<Gated<QuizProfile>> {
        let file = self.get_file(user_id, file_id).await?;

        let decision = self.entitlement.check_quiz(user_id).await?;
        if !decision.allowed {
            return Ok(Gated::Denied(decision));
        }

        let questions = self.intelligence.quiz_questions(&file.source_text).await?;
        let quiz = self.content_repo.insert_quiz(user_id, file_id, &questions).await?;
        Ok(Gated::Allowed(quiz))
    }

    pub async fn chat_history(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<ChatMessageProfile>> {
        self.get_file(user_id, file_id).await?;
        self.content_repo.list_chat_messages(user_id, file_id).await
    }

    /// Ask the file's chatbot a question. The check runs against the count
    /// before this turn; an allowed turn then appends both the question and
    /// the answer, so each exchange consumes two of the per-file budget.
    #[instrument(skip(self, question))]
    pub async fn send_chat_message(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        question: &str,
    ) -> AppResult<Gated<ChatReply>> {
        let file = self.get_file(user_id, file_id).await?;

        let decision = self.entitlement.check_chat_message(user_id, file_id).await?;
        if !decision.allowed {
            return Ok(Gated::Denied(decision));
        }

        let history: Vec<ChatTurn> = self
            .content_repo
            .list_chat_messages(user_id, file_id)
            .await?
            .into_iter()
            .map(|m| ChatTurn { role: m.role, content: m.content })
            .collect();

        let answer_text = self
            .intelligence
            .answer(&file.source_text, &history, question)
            .await?;

        let question = self
            .content_repo
            .insert_chat_message(user_id, file_id, ChatRole::User, question)
            .await?;
        let answer = self
            .content_repo
            .insert_chat_message(user_id, file_id, ChatRole::Bot, &answer_text)
            .await?;

        Ok(Gated::Allowed(ChatReply { question, answer }))
    }
}
