use async_trait::async_trait;

use crate::app_error::AppResult;
use crate::domain::entities::content::ChatRole;

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Model-backed text generation. Summaries, chat answers, and quiz questions
/// are produced by an external provider behind this port.
#[async_trait]
pub trait ContentIntelligence: Send + Sync {
    async fn summarize(&self, source_text: &str) -> AppResult<String>;

    async fn answer(
        &self,
        source_text: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> AppResult<String>;

    /// Quiz questions as provider-shaped JSON; the core only stores and
    /// relays them.
    async fn quiz_questions(&self, source_text: &str) -> AppResult<serde_json::Value>;
}

#[derive(Debug, Clone)]
pub struct YoutubeTranscript {
    pub title: String,
    pub duration_min: f64,
    pub text: String,
}

/// Transcript lookup for video links. Duration comes back with the
/// transcript so the upload check can run before anything is stored.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn youtube_transcript(&self, video_url: &str) -> AppResult<YoutubeTranscript>;
}
