use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::lifecycle::SubscriptionRepo;
use crate::application::use_cases::plan_catalog::PlanCatalogUseCases;
use crate::domain::entities::content::FileKind;
use crate::domain::entities::plan::Plan;
use crate::domain::entities::subscription::SubscriptionStatus;

// ============================================================================
// Ledger Trait
// ============================================================================

/// Read-only counts over the usage event log. The engine never writes;
/// producers append events only after an allow decision.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn count_uploads_since(
        &self,
        user_id: Uuid,
        kind: FileKind,
        since: NaiveDateTime,
    ) -> AppResult<i64>;

    async fn count_quizzes_since(&self, user_id: Uuid, since: NaiveDateTime) -> AppResult<i64>;

    /// Creation times of all summaries for (user, file), ascending. The
    /// earliest is the initial summary; later ones are regenerations.
    async fn summary_timestamps(&self, user_id: Uuid, file_id: Uuid)
    -> AppResult<Vec<NaiveDateTime>>;

    /// Counts both user and bot rows; the per-file chat limit meters total
    /// conversation length, not just user messages.
    async fn count_chat_messages(&self, user_id: Uuid, file_id: Uuid) -> AppResult<i64>;
}

// ============================================================================
// Decision Types
// ============================================================================

/// Why a check allowed or denied. Variants carry the numbers the boundary
/// needs to render a user-facing message; callers branch on the code, never
/// on the text.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionReason {
    UploadsRemaining { kind: FileKind, remaining: i64 },
    QuizzesRemaining { remaining: i64 },
    RegenerationsRemaining { remaining: i64 },
    MessagesRemaining { remaining: i64 },
    NoSubscription,
    NoActivePlan,
    SubscriptionCanceled,
    MonthlyUploadLimitReached { kind: FileKind, limit: i32 },
    FileTooLarge { limit_mb: i32, actual_mb: f64 },
    TooManyPages { limit: i32, actual: i32 },
    MediaTooLong { kind: FileKind, limit_min: i32, actual_min: f64 },
    MonthlyQuizLimitReached { limit: i32 },
    NoSummaryYet,
    RegenerationLimitReached { limit: i32 },
    ChatLimitReached { limit: i32 },
}

impl DecisionReason {
    pub fn code(&self) -> &'static str {
        match self {
            DecisionReason::UploadsRemaining { .. }
            | DecisionReason::QuizzesRemaining { .. }
            | DecisionReason::RegenerationsRemaining { .. }
            | DecisionReason::MessagesRemaining { .. } => "OK",
            DecisionReason::NoSubscription => "NO_SUBSCRIPTION",
            DecisionReason::NoActivePlan => "NO_ACTIVE_PLAN",
            DecisionReason::SubscriptionCanceled => "SUBSCRIPTION_CANCELED",
            DecisionReason::MonthlyUploadLimitReached { .. } => "MONTHLY_UPLOAD_LIMIT",
            DecisionReason::FileTooLarge { .. } => "FILE_TOO_LARGE",
            DecisionReason::TooManyPages { .. } => "TOO_MANY_PAGES",
            DecisionReason::MediaTooLong { .. } => "MEDIA_TOO_LONG",
            DecisionReason::MonthlyQuizLimitReached { .. } => "MONTHLY_QUIZ_LIMIT",
            DecisionReason::NoSummaryYet => "NO_SUMMARY_YET",
            DecisionReason::RegenerationLimitReached { .. } => "REGENERATION_LIMIT",
            DecisionReason::ChatLimitReached { .. } => "CHAT_MESSAGE_LIMIT",
        }
    }

    /// Presentation text, generated from the code and its numbers at the
    /// boundary.
    pub fn message(&self) -> String {
        match self {
            DecisionReason::UploadsRemaining { kind, remaining } => format!(
                "OK - You have {} {} uploads remaining this month",
                remaining,
                kind.as_str()
            ),
            DecisionReason::QuizzesRemaining { remaining } => {
                format!("OK - You have {} quizzes remaining this month", remaining)
            }
            DecisionReason::RegenerationsRemaining { remaining } => format!(
                "OK - You have {} summary regenerations remaining for this file",
                remaining
            ),
            DecisionReason::MessagesRemaining { remaining } => {
                format!("OK - You have {} messages remaining for this file", remaining)
            }
            DecisionReason::NoSubscription => "No subscription found for your account".to_string(),
            DecisionReason::NoActivePlan => "You don't have an active plan".to_string(),
            DecisionReason::SubscriptionCanceled => {
                "Your subscription has been canceled".to_string()
            }
            DecisionReason::MonthlyUploadLimitReached { kind, limit } => match kind {
                FileKind::Pdf => {
                    format!("You've reached your monthly limit of {} PDF uploads", limit)
                }
                FileKind::Audio => {
                    format!("You've reached your monthly limit of {} audio uploads", limit)
                }
                FileKind::Youtube => {
                    format!("You've reached your monthly limit of {} YouTube links", limit)
                }
            },
            DecisionReason::FileTooLarge { limit_mb, actual_mb } => format!(
                "File must be less than or equal to {}MB (current: {:.1}MB)",
                limit_mb, actual_mb
            ),
            DecisionReason::TooManyPages { limit, actual } => {
                format!("PDF must be {} pages or less (current: {} pages)", limit, actual)
            }
            DecisionReason::MediaTooLong { kind, limit_min, actual_min } => {
                let noun = if *kind == FileKind::Audio { "Audio" } else { "Video" };
                format!(
                    "{} must be {} minutes or less (current: {:.1} minutes)",
                    noun, limit_min, actual_min
                )
            }
            DecisionReason::MonthlyQuizLimitReached { limit } => {
                format!("You've reached your monthly limit of {} quizzes", limit)
            }
            DecisionReason::NoSummaryYet => "No summary exists for this file yet".to_string(),
            DecisionReason::RegenerationLimitReached { limit } => format!(
                "You've reached the limit of {} summary regenerations for this file",
                limit
            ),
            DecisionReason::ChatLimitReached { limit } => {
                format!("You've reached the limit of {} messages for this file", limit)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    /// Quota headroom before this action is recorded. Absent for
    /// precondition and state failures where no count applies.
    pub remaining: Option<i64>,
}

impl EntitlementDecision {
    pub fn allow(reason: DecisionReason, remaining: i64) -> Self {
        Self { allowed: true, reason, remaining: Some(remaining) }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason, remaining: None }
    }
}

impl Serialize for EntitlementDecision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("EntitlementDecision", 4)?;
        s.serialize_field("allowed", &self.allowed)?;
        s.serialize_field("reason", self.reason.code())?;
        s.serialize_field("remaining", &self.remaining)?;
        s.serialize_field("message", &self.reason.message())?;
        s.end()
    }
}

/// Action metadata supplied with an upload check. All fields optional; a
/// missing value skips the corresponding ceiling check.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadMetadata {
    pub size_mb: Option<f64>,
    pub duration_min: Option<f64>,
    pub pages: Option<i32>,
}

// ============================================================================
// Use Cases
// ============================================================================

/// Answers "may this action proceed?" for the five metered resource
/// classes. Pure read-then-decide: consults the subscription, the plan's
/// limits, and ledger counts, and never writes.
#[derive(Clone)]
pub struct EntitlementUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    catalog: PlanCatalogUseCases,
    ledger: Arc<dyn UsageLedger>,
}

enum PlanLookup {
    Found(Plan),
    Denied(EntitlementDecision),
}

impl EntitlementUseCases {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepo>,
        catalog: PlanCatalogUseCases,
        ledger: Arc<dyn UsageLedger>,
    ) -> Self {
        Self { subscription_repo, catalog, ledger }
    }

    #[instrument(skip(self))]
    pub async fn check_upload(
        &self,
        user_id: Uuid,
        kind: FileKind,
        metadata: UploadMetadata,
    ) -> AppResult<EntitlementDecision> {
        let now = Utc::now().naive_utc();
        let plan = match self.resolve_plan(user_id, now).await? {
            PlanLookup::Found(plan) => plan,
            PlanLookup::Denied(decision) => return Ok(decision),
        };

        let monthly_uploads = self
            .ledger
            .count_uploads_since(user_id, kind, month_start(now))
            .await?;
        let limit = plan.uploads_per_month(kind);
        let remaining = i64::from(limit) - monthly_uploads;
        if remaining <= 0 {
            return Ok(EntitlementDecision::deny(
                DecisionReason::MonthlyUploadLimitReached { kind, limit },
            ));
        }

        // Ceiling checks only run once the monthly count has passed, and the
        // first violated one wins: size, then pages or duration.
        if kind != FileKind::Youtube {
            if let Some(size_mb) = metadata.size_mb {
                let limit_mb = match kind {
                    FileKind::Pdf => plan.pdf_max_size_mb,
                    _ => plan.audio_max_size_mb,
                };
                if size_mb > f64::from(limit_mb) {
                    return Ok(EntitlementDecision::deny(DecisionReason::FileTooLarge {
                        limit_mb,
                        actual_mb: size_mb,
                    }));
                }
            }
        }

        match kind {
            FileKind::Pdf => {
                if let Some(pages) = metadata.pages {
                    if pages > plan.pdf_max_pages {
                        return Ok(EntitlementDecision::deny(DecisionReason::TooManyPages {
                            limit: plan.pdf_max_pages,
                            actual: pages,
                        }));
                    }
                }
            }
            FileKind::Audio | FileKind::Youtube => {
                if let Some(duration_min) = metadata.duration_min {
                    let limit_min = match kind {
                        FileKind::Audio => plan.audio_max_length_min,
                        _ => plan.youtube_max_length_min,
                    };
                    if duration_min > f64::from(limit_min) {
                        return Ok(EntitlementDecision::deny(DecisionReason::MediaTooLong {
                            kind,
                            limit_min,
                            actual_min: duration_min,
                        }));
                    }
                }
            }
        }

        Ok(EntitlementDecision::allow(
            DecisionReason::UploadsRemaining { kind, remaining },
            remaining,
        ))
    }

    #[instrument(skip(self))]
    pub async fn check_quiz(&self, user_id: Uuid) -> AppResult<EntitlementDecision> {
        let now = Utc::now().naive_utc();
        let plan = match self.resolve_plan(user_id, now).await? {
            PlanLookup::Found(plan) => plan,
            PlanLookup::Denied(decision) => return Ok(decision),
        };

        let monthly_quizzes = self
            .ledger
            .count_quizzes_since(user_id, month_start(now))
            .await?;
        let remaining = i64::from(plan.quizzes_per_month) - monthly_quizzes;
        if remaining <= 0 {
            return Ok(EntitlementDecision::deny(
                DecisionReason::MonthlyQuizLimitReached { limit: plan.quizzes_per_month },
            ));
        }

        Ok(EntitlementDecision::allow(
            DecisionReason::QuizzesRemaining { remaining },
            remaining,
        ))
    }

    #[instrument(skip(self))]
    pub async fn check_summary_regeneration(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<EntitlementDecision> {
        let now = Utc::now().naive_utc();
        let plan = match self.resolve_plan(user_id, now).await? {
            PlanLookup::Found(plan) => plan,
            PlanLookup::Denied(decision) => return Ok(decision),
        };

        let timestamps = self.ledger.summary_timestamps(user_id, file_id).await?;
        let Some(initial) = timestamps.first().copied() else {
            // Precondition failure, not a quota failure: regeneration needs
            // an initial summary to exist first.
            return Ok(EntitlementDecision::deny(DecisionReason::NoSummaryYet));
        };

        let regeneration_count = timestamps.iter().filter(|ts| **ts > initial).count() as i64;
        let remaining = i64::from(plan.summary_regenerations_per_file) - regeneration_count;
        if remaining <= 0 {
            return Ok(EntitlementDecision::deny(
                DecisionReason::RegenerationLimitReached {
                    limit: plan.summary_regenerations_per_file,
                },
            ));
        }

        Ok(EntitlementDecision::allow(
            DecisionReason::RegenerationsRemaining { remaining },
            remaining,
        ))
    }

    #[instrument(skip(self))]
    pub async fn check_chat_message(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<EntitlementDecision> {
        let now = Utc::now().naive_utc();
        let plan = match self.resolve_plan(user_id, now).await? {
            PlanLookup::Found(plan) => plan,
            PlanLookup::Denied(decision) => return Ok(decision),
        };

        let message_count = self.ledger.count_chat_messages(user_id, file_id).await?;
        let remaining = i64::from(plan.chatbot_messages_per_file) - message_count;
        if remaining <= 0 {
            return Ok(EntitlementDecision::deny(DecisionReason::ChatLimitReached {
                limit: plan.chatbot_messages_per_file,
            }));
        }

        Ok(EntitlementDecision::allow(
            DecisionReason::MessagesRemaining { remaining },
            remaining,
        ))
    }

    /// Shared preconditions: the user must have a subscription, the
    /// subscription must reference an existing plan, and the effective
    /// status must not be canceled. Each failure maps to its own reason
    /// code so callers cannot confuse "no subscription" with "denied by
    /// quota".
    ///
    /// A lapsed cancellation entitles the user to the free tier, so the
    /// pending grace-period reversion is resolved here before anything is
    /// evaluated against the plan.
    async fn resolve_plan(&self, user_id: Uuid, now: NaiveDateTime) -> AppResult<PlanLookup> {
        let Some(mut subscription) = self.subscription_repo.get_by_user(user_id).await? else {
            return Ok(PlanLookup::Denied(EntitlementDecision::deny(
                DecisionReason::NoSubscription,
            )));
        };

        if subscription.grace_period_expired(now) {
            let free_plan = self.catalog.get_or_create_free_plan().await?;
            let reverted = self
                .subscription_repo
                .revert_to_free_if_expired(subscription.id, free_plan.id, now)
                .await?;
            if reverted {
                info!(%user_id, "Reverted expired canceled subscription to free plan");
            }
            subscription = self
                .subscription_repo
                .get_by_user(user_id)
                .await?
                .ok_or(AppError::NotFound)?;
        }

        let Some(plan_id) = subscription.plan_id else {
            return Ok(PlanLookup::Denied(EntitlementDecision::deny(
                DecisionReason::NoActivePlan,
            )));
        };

        if subscription.effective_status(now) == SubscriptionStatus::Canceled {
            return Ok(PlanLookup::Denied(EntitlementDecision::deny(
                DecisionReason::SubscriptionCanceled,
            )));
        }

        match self.catalog.get(plan_id).await? {
            Some(plan) => Ok(PlanLookup::Found(plan)),
            None => Ok(PlanLookup::Denied(EntitlementDecision::deny(
                DecisionReason::NoActivePlan,
            ))),
        }
    }
}

/// First instant of the current calendar month, UTC.
pub fn month_start(now: NaiveDateTime) -> NaiveDateTime {
    now.date()
        .with_day(1)
        .expect("day 1 exists in every month")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
}
