use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FREE_PLAN_NAME: &str = "free";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Free,
    Monthly,
    Yearly,
}

/// A catalog plan: tier name, billing terms, and the full set of metered
/// limits. Rows are seeded once and only edited through the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub billing_period: BillingPeriod,
    pub is_free: bool,
    pub price_cents: i32,
    pub description: String,
    /// External billing-provider plan id. Always None for the free tier.
    pub polar_plan_id: Option<String>,
    pub pdf_uploads_per_month: i32,
    pub pdf_max_size_mb: i32,
    pub pdf_max_pages: i32,
    pub audio_uploads_per_month: i32,
    pub audio_max_size_mb: i32,
    pub audio_max_length_min: i32,
    pub youtube_links_per_month: i32,
    pub youtube_max_length_min: i32,
    pub quizzes_per_month: i32,
    pub summary_regenerations_per_file: i32,
    pub chatbot_messages_per_file: i32,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Plan {
    /// Save-time invariant for the free tier: regardless of how the row was
    /// constructed, a plan named "free" carries no price, no billing cycle,
    /// and no external billing id. Must run on every save, not just create.
    pub fn normalize(&mut self) {
        if self.name == FREE_PLAN_NAME {
            self.is_free = true;
            self.billing_period = BillingPeriod::Free;
            self.price_cents = 0;
            self.polar_plan_id = None;
        }
    }

    /// The seeded free tier used by the bootstrap path and by signup
    /// provisioning when no free plan exists yet.
    pub fn free_defaults() -> Self {
        Plan {
            id: Uuid::new_v4(),
            name: FREE_PLAN_NAME.to_string(),
            billing_period: BillingPeriod::Free,
            is_free: true,
            price_cents: 0,
            description: "Free tier with basic features".to_string(),
            polar_plan_id: None,
            pdf_uploads_per_month: 4,
            pdf_max_size_mb: 5,
            pdf_max_pages: 10,
            audio_uploads_per_month: 1,
            audio_max_size_mb: 10,
            audio_max_length_min: 10,
            youtube_links_per_month: 1,
            youtube_max_length_min: 10,
            quizzes_per_month: 5,
            summary_regenerations_per_file: 1,
            chatbot_messages_per_file: 10,
            created_at: None,
            updated_at: None,
        }
    }

    /// Monthly upload allowance for a file kind.
    pub fn uploads_per_month(&self, kind: crate::domain::entities::content::FileKind) -> i32 {
        use crate::domain::entities::content::FileKind;
        match kind {
            FileKind::Pdf => self.pdf_uploads_per_month,
            FileKind::Audio => self.audio_uploads_per_month,
            FileKind::Youtube => self.youtube_links_per_month,
        }
    }
}
