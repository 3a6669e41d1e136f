use async_trait::async_trait;
use serde::Deserialize;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::content_ai::{TranscriptFetcher, YoutubeTranscript};

/// Client for the transcript service that resolves a video URL into title,
/// duration, and transcript text.
pub struct TranscriptClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    title: String,
    duration_min: f64,
    text: String,
}

impl TranscriptClient {
    pub fn new(api_base: String) -> Self {
        Self { http: reqwest::Client::new(), api_base }
    }
}

#[async_trait]
impl TranscriptFetcher for TranscriptClient {
    async fn youtube_transcript(&self, video_url: &str) -> AppResult<YoutubeTranscript> {
        let url = format!("{}/transcript", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[("url", video_url)])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Transcript fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::InvalidInput(
                "Could not fetch a transcript for this video".to_string(),
            ));
        }

        let parsed: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid transcript response: {e}")))?;

        Ok(YoutubeTranscript {
            title: parsed.title,
            duration_min: parsed.duration_min,
            text: parsed.text,
        })
    }
}
