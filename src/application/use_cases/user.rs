use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use async_trait::async_trait;

use crate::app_error::AppResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Identity lives upstream; this repo only mirrors the users the auth proxy
/// has already authenticated. Rows are created from the proxy's forwarded
/// identity on first contact and looked up by email when billing events
/// arrive.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;

    /// Upsert keyed on the proxy-assigned user id; a changed email on an
    /// existing row is overwritten.
    async fn upsert(&self, id: Uuid, email: &str) -> AppResult<UserProfile>;
}
