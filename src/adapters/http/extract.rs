use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::app_error::AppError;

/// The authenticated caller. Identity is handled by the auth proxy in
/// front of this service, which forwards the verified user id in
/// `x-user-id`; a request without a parsable id is rejected before any
/// handler runs.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for AuthedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(AuthedUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Full forwarded identity, for the endpoints that mirror the user row.
/// The proxy sends the verified email alongside the id in `x-user-email`.
#[derive(Debug, Clone)]
pub struct AuthedIdentity {
    pub user_id: Uuid,
    pub email: String,
}

impl<S: Send + Sync> FromRequestParts<S> for AuthedIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthedUser(user_id) = AuthedUser::from_request_parts(parts, state).await?;
        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();
        Ok(AuthedIdentity { user_id, email })
    }
}
