use axum::Router;

use crate::adapters::http::app_state::AppState;

pub mod billing_webhook;
pub mod content;
pub mod plans;
pub mod subscription;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(plans::router())
        .merge(subscription::router())
        .merge(billing_webhook::router())
        .merge(content::router())
}
