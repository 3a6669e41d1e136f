use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::{adapters::http::app_state::AppState, app_error::AppResult};
use crate::domain::entities::plan::Plan;

#[derive(Serialize)]
struct PlansResponse {
    items: Vec<Plan>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/plans", get(list_plans))
}

/// Public pricing-page listing, cheapest first.
async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let plans = app_state.plan_catalog.list().await?;
    Ok(Json(PlansResponse { items: plans }))
}
