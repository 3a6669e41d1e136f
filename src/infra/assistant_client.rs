use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::content_ai::{ChatTurn, ContentIntelligence};
use crate::domain::entities::content::ChatRole;

const SUMMARY_PROMPT: &str =
    "Summarize the following study material into clear, well-structured notes.";
const QUIZ_PROMPT: &str = "Generate multiple-choice quiz questions for the following study \
     material. Respond with a JSON array of objects with keys \"question\", \"options\", and \
     \"correct_answer\".";

/// OpenAI-compatible chat-completions client behind the
/// [`ContentIntelligence`] port.
pub struct AssistantClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AssistantClient {
    pub fn new(api_base: String, api_key: SecretString, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
            model,
        }
    }

    async fn complete(&self, messages: serde_json::Value) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "model": self.model, "messages": messages }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Assistant request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Internal(format!("Assistant returned {status}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid assistant response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Internal("Assistant returned no choices".to_string()))
    }
}

#[async_trait]
impl ContentIntelligence for AssistantClient {
    async fn summarize(&self, source_text: &str) -> AppResult<String> {
        self.complete(json!([
            { "role": "system", "content": SUMMARY_PROMPT },
            { "role": "user", "content": source_text },
        ]))
        .await
    }

    async fn answer(
        &self,
        source_text: &str,
        history: &[ChatTurn],
        question: &str,
    ) -> AppResult<String> {
        let mut messages = vec![json!({
            "role": "system",
            "content": format!(
                "Answer questions about the following study material.\n\n{source_text}"
            ),
        })];
        for turn in history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Bot => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": question }));
        self.complete(serde_json::Value::Array(messages)).await
    }

    async fn quiz_questions(&self, source_text: &str) -> AppResult<serde_json::Value> {
        let content = self
            .complete(json!([
                { "role": "system", "content": QUIZ_PROMPT },
                { "role": "user", "content": source_text },
            ]))
            .await?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Internal(format!("Assistant returned malformed quiz JSON: {e}")))
    }
}
