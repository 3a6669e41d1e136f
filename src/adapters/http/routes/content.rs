use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, extract::AuthedUser},
    app_error::{AppError, AppResult},
    application::use_cases::content::{Gated, NewFileInput},
    domain::entities::content::FileKind,
};

#[derive(Deserialize)]
struct RegisterUploadPayload {
    kind: String,
    title: String,
    size_mb: Option<f64>,
    pages: Option<i32>,
    duration_min: Option<f64>,
    source_text: String,
}

#[derive(Deserialize)]
struct YoutubePayload {
    url: String,
}

#[derive(Deserialize)]
struct ChatPayload {
    message: String,
}

#[derive(Serialize)]
struct ItemsResponse<T> {
    items: Vec<T>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files).post(register_upload))
        .route("/files/youtube", post(register_youtube))
        .route("/files/{id}", get(get_file))
        .route("/files/{id}/summary", post(create_summary))
        .route("/files/{id}/summary/regenerate", post(regenerate_summary))
        .route("/files/{id}/quiz", post(create_quiz))
        .route("/files/{id}/chat", get(chat_history).post(send_chat_message))
}

/// A quota denial is a complete answer, not an error: 403 with the decision
/// body so clients can render the reason.
fn gated<T: Serialize>(result: Gated<T>, success: StatusCode) -> Response {
    match result {
        Gated::Allowed(value) => (success, Json(value)).into_response(),
        Gated::Denied(decision) => (StatusCode::FORBIDDEN, Json(decision)).into_response(),
    }
}

async fn list_files(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> AppResult<impl IntoResponse> {
    let files = app_state.content.list_files(user_id).await?;
    Ok(Json(ItemsResponse { items: files }))
}

async fn get_file(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let file = app_state.content.get_file(user_id, id).await?;
    Ok(Json(file))
}

async fn register_upload(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Json(payload): Json<RegisterUploadPayload>,
) -> AppResult<Response> {
    let kind = FileKind::from_str(&payload.kind)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown file kind: {}", payload.kind)))?;

    let result = app_state
        .content
        .register_upload(
            user_id,
            NewFileInput {
                kind,
                title: payload.title,
                size_mb: payload.size_mb,
                pages: payload.pages,
                duration_min: payload.duration_min,
                video_url: None,
                source_text: payload.source_text,
            },
        )
        .await?;
    Ok(gated(result, StatusCode::CREATED))
}

async fn register_youtube(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Json(payload): Json<YoutubePayload>,
) -> AppResult<Response> {
    let result = app_state
        .content
        .register_youtube_link(user_id, &payload.url)
        .await?;
    Ok(gated(result, StatusCode::CREATED))
}

async fn create_summary(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let summary = app_state.content.create_summary(user_id, id).await?;
    Ok(Json(summary))
}

async fn regenerate_summary(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let result = app_state.content.regenerate_summary(user_id, id).await?;
    Ok(gated(result, StatusCode::OK))
}

async fn create_quiz(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let result = app_state.content.create_quiz(user_id, id).await?;
    Ok(gated(result, StatusCode::CREATED))
}

async fn chat_history(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let messages = app_state.content.chat_history(user_id, id).await?;
    Ok(Json(ItemsResponse { items: messages }))
}

async fn send_chat_message(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChatPayload>,
) -> AppResult<Response> {
    let result = app_state
        .content
        .send_chat_message(user_id, id, &payload.message)
        .await?;
    Ok(gated(result, StatusCode::OK))
}
