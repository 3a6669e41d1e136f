use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    adapters::http::{
        app_state::AppState,
        extract::{AuthedIdentity, AuthedUser},
    },
    app_error::AppResult,
    application::use_cases::lifecycle::SubscriptionView,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscription", get(current_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
}

/// The caller's subscription. First contact mirrors the forwarded identity
/// and provisions the free tier; reading resolves any pending grace-period
/// reversion.
async fn current_subscription(
    State(app_state): State<AppState>,
    identity: AuthedIdentity,
) -> AppResult<impl IntoResponse> {
    let user_id = identity.user_id;
    let view: SubscriptionView = match app_state.lifecycle.current_subscription(user_id).await? {
        Some(view) => view,
        None => {
            let subscription = app_state
                .lifecycle
                .provision_free_subscription(user_id, &identity.email)
                .await?;
            let plan = match subscription.plan_id {
                Some(plan_id) => app_state.plan_catalog.get(plan_id).await?,
                None => None,
            };
            let effective_status = subscription.effective_status(chrono::Utc::now().naive_utc());
            SubscriptionView { subscription, plan, effective_status }
        }
    };
    Ok(Json(view))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> AppResult<impl IntoResponse> {
    app_state.lifecycle.cancel(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
