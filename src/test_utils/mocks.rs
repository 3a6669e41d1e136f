//! In-memory mock implementations of the repository and provider traits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use chrono::{Duration, NaiveDateTime, Utc};

use crate::app_error::{AppError, AppResult};
use crate::application::ports::billing_provider::BillingProviderPort;
use crate::application::ports::content_ai::{
    ChatTurn, ContentIntelligence, TranscriptFetcher, YoutubeTranscript,
};
use crate::application::use_cases::content::{
    ChatMessageProfile, ContentRepo, FileProfile, NewFileInput, QuizProfile, SummaryProfile,
};
use crate::application::use_cases::entitlement::UsageLedger;
use crate::application::use_cases::lifecycle::{
    BillingUpsert, CreateSubscriptionInput, SubscriptionRepo,
};
use crate::application::use_cases::plan_catalog::PlanRepo;
use crate::application::use_cases::user::{UserProfile, UserRepo};
use crate::domain::entities::content::{ChatRole, FileKind};
use crate::domain::entities::plan::Plan;
use crate::domain::entities::subscription::{Subscription, SubscriptionStatus};

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<Plan>) -> Self {
        let map: HashMap<Uuid, Plan> = plans.into_iter().map(|p| (p.id, p)).collect();
        Self { plans: Mutex::new(map) }
    }

    pub fn seed(&self, plan: Plan) {
        self.plans.lock().unwrap().insert(plan.id, plan);
    }

    pub fn plan_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn get_by_polar_plan_id(&self, polar_plan_id: &str) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.polar_plan_id.as_deref() == Some(polar_plan_id))
            .cloned())
    }

    async fn list_by_price(&self) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self.plans.lock().unwrap().values().cloned().collect();
        plans.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then(a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn save(&self, plan: &Plan) -> AppResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        let mut stored = plan.clone();
        stored.updated_at = Some(Utc::now().naive_utc());
        plans.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn insert_if_absent(&self, plan: &Plan) -> AppResult<()> {
        let mut plans = self.plans.lock().unwrap();
        if plans.values().any(|p| p.name == plan.name) {
            return Ok(());
        }
        plans.insert(plan.id, plan.clone());
        Ok(())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
    reversions: AtomicI64,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let map: HashMap<Uuid, Subscription> =
            subscriptions.into_iter().map(|s| (s.id, s)).collect();
        Self { subscriptions: Mutex::new(map), reversions: AtomicI64::new(0) }
    }

    pub fn seed(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// How many times a grace-period reversion actually wrote.
    pub fn reversion_count(&self) -> i64 {
        self.reversions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn get_by_polar_subscription_id(
        &self,
        polar_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.polar_subscription_id.as_deref() == Some(polar_subscription_id))
            .cloned())
    }

    async fn create_if_absent(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        let mut subs = self.subscriptions.lock().unwrap();
        if let Some(existing) = subs.values().find(|s| s.user_id == input.user_id) {
            return Ok(existing.clone());
        }

        let now = Utc::now().naive_utc();
        let sub = Subscription {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_id: input.plan_id,
            status: input.status,
            is_active: input.is_active,
            current_period_start: input.current_period_start,
            current_period_end: input.current_period_end,
            trial_end: input.trial_end,
            polar_subscription_id: input.polar_subscription_id.clone(),
            canceled_at: None,
            pause_collection: false,
            last_webhook_received: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        subs.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn upsert_from_billing(
        &self,
        user_id: Uuid,
        update: &BillingUpsert,
    ) -> AppResult<Subscription> {
        let mut subs = self.subscriptions.lock().unwrap();
        let now = Utc::now().naive_utc();

        if let Some(sub) = subs.values_mut().find(|s| s.user_id == user_id) {
            sub.plan_id = Some(update.plan_id);
            sub.status = update.status;
            sub.is_active = true;
            sub.current_period_start = update.current_period_start;
            sub.current_period_end = update.current_period_end;
            sub.trial_end = update.trial_end;
            sub.polar_subscription_id = Some(update.polar_subscription_id.clone());
            sub.canceled_at = None;
            sub.last_webhook_received = Some(update.last_webhook_received);
            sub.updated_at = Some(now);
            return Ok(sub.clone());
        }

        let sub = Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id: Some(update.plan_id),
            status: update.status,
            is_active: true,
            current_period_start: update.current_period_start,
            current_period_end: update.current_period_end,
            trial_end: update.trial_end,
            polar_subscription_id: Some(update.polar_subscription_id.clone()),
            canceled_at: None,
            pause_collection: false,
            last_webhook_received: Some(update.last_webhook_received),
            created_at: Some(now),
            updated_at: Some(now),
        };
        subs.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn mark_canceled(&self, id: Uuid, canceled_at: Option<NaiveDateTime>) -> AppResult<()> {
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs.get_mut(&id).ok_or(AppError::NotFound)?;
        sub.status = SubscriptionStatus::Canceled;
        sub.is_active = false;
        if canceled_at.is_some() {
            sub.canceled_at = canceled_at;
        }
        sub.updated_at = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn revert_to_free_if_expired(
        &self,
        id: Uuid,
        free_plan_id: Uuid,
        now: NaiveDateTime,
    ) -> AppResult<bool> {
        let mut subs = self.subscriptions.lock().unwrap();
        let sub = subs.get_mut(&id).ok_or(AppError::NotFound)?;

        // Same predicate as the SQL WHERE clause.
        let expired = sub.status == SubscriptionStatus::Canceled
            && sub.current_period_end.map(|end| now > end).unwrap_or(false);
        if !expired {
            return Ok(false);
        }

        sub.plan_id = Some(free_plan_id);
        sub.status = SubscriptionStatus::Active;
        sub.is_active = true;
        sub.current_period_start = Some(now);
        sub.current_period_end = None;
        sub.trial_end = None;
        sub.polar_subscription_id = None;
        sub.canceled_at = None;
        sub.updated_at = Some(now);
        self.reversions.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, email: &str) -> UserProfile {
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Some(Utc::now().naive_utc()),
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert(&self, id: Uuid, email: &str) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();
        let user = users.entry(id).or_insert_with(|| UserProfile {
            id,
            email: String::new(),
            created_at: Some(Utc::now().naive_utc()),
        });
        user.email = email.to_lowercase();
        Ok(user.clone())
    }
}

// ============================================================================
// InMemoryBillingProvider
// ============================================================================

/// Records outbound provider calls for assertions. Webhook verification
/// passes unless a test flips it off.
#[derive(Default)]
pub struct InMemoryBillingProvider {
    canceled: Mutex<Vec<String>>,
    updated: Mutex<Vec<(String, String)>>,
    verify_ok: Mutex<bool>,
}

impl InMemoryBillingProvider {
    pub fn new() -> Self {
        Self {
            canceled: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            verify_ok: Mutex::new(true),
        }
    }

    pub fn set_verify(&self, ok: bool) {
        *self.verify_ok.lock().unwrap() = ok;
    }

    pub fn canceled(&self) -> Vec<String> {
        self.canceled.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<(String, String)> {
        self.updated.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingProviderPort for InMemoryBillingProvider {
    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        self.canceled.lock().unwrap().push(subscription_id.to_string());
        Ok(())
    }

    async fn update_subscription(&self, subscription_id: &str, plan_id: &str) -> AppResult<()> {
        self.updated
            .lock()
            .unwrap()
            .push((subscription_id.to_string(), plan_id.to_string()));
        Ok(())
    }

    fn verify_webhook(&self, _body: &[u8], _signature: &str) -> bool {
        *self.verify_ok.lock().unwrap()
    }
}

// ============================================================================
// InMemoryLedger
// ============================================================================

/// Bare usage-event log for exercising the entitlement checks directly.
#[derive(Default)]
pub struct InMemoryLedger {
    uploads: Mutex<Vec<(Uuid, FileKind, NaiveDateTime)>>,
    quizzes: Mutex<Vec<(Uuid, NaiveDateTime)>>,
    summaries: Mutex<Vec<(Uuid, Uuid, NaiveDateTime)>>,
    chat_messages: Mutex<Vec<(Uuid, Uuid, ChatRole)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_upload(&self, user_id: Uuid, kind: FileKind, at: NaiveDateTime) {
        self.uploads.lock().unwrap().push((user_id, kind, at));
    }

    pub fn add_quiz(&self, user_id: Uuid, at: NaiveDateTime) {
        self.quizzes.lock().unwrap().push((user_id, at));
    }

    pub fn add_summary(&self, user_id: Uuid, file_id: Uuid, at: NaiveDateTime) {
        self.summaries.lock().unwrap().push((user_id, file_id, at));
    }

    pub fn add_chat_message(&self, user_id: Uuid, file_id: Uuid, role: ChatRole) {
        self.chat_messages.lock().unwrap().push((user_id, file_id, role));
    }
}

#[async_trait]
impl UsageLedger for InMemoryLedger {
    async fn count_uploads_since(
        &self,
        user_id: Uuid,
        kind: FileKind,
        since: NaiveDateTime,
    ) -> AppResult<i64> {
        Ok(self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, k, at)| *u == user_id && *k == kind && *at >= since)
            .count() as i64)
    }

    async fn count_quizzes_since(&self, user_id: Uuid, since: NaiveDateTime) -> AppResult<i64> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, at)| *u == user_id && *at >= since)
            .count() as i64)
    }

    async fn summary_timestamps(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<NaiveDateTime>> {
        let mut timestamps: Vec<NaiveDateTime> = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, f, _)| *u == user_id && *f == file_id)
            .map(|(_, _, at)| *at)
            .collect();
        timestamps.sort();
        Ok(timestamps)
    }

    async fn count_chat_messages(&self, user_id: Uuid, file_id: Uuid) -> AppResult<i64> {
        Ok(self
            .chat_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, f, _)| *u == user_id && *f == file_id)
            .count() as i64)
    }
}

// ============================================================================
// InMemoryContentStore
// ============================================================================

/// Content tables and usage counts backed by the same storage, like the
/// database gives the real adapters. Implements both [`ContentRepo`] and
/// [`UsageLedger`] so check-then-record flows see their own writes.
#[derive(Default)]
pub struct InMemoryContentStore {
    files: Mutex<Vec<FileProfile>>,
    summaries: Mutex<Vec<(Uuid, SummaryProfile)>>,
    quizzes: Mutex<Vec<(Uuid, QuizProfile)>>,
    chat_messages: Mutex<Vec<(Uuid, ChatMessageProfile)>>,
    seq: AtomicI64,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Monotonic timestamps; wall-clock reads inside one test can collide.
    fn next_timestamp(&self) -> NaiveDateTime {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Utc::now().naive_utc() + Duration::microseconds(n)
    }

    pub fn quiz_count(&self, user_id: Uuid) -> usize {
        self.quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user_id)
            .count()
    }
}

#[async_trait]
impl ContentRepo for InMemoryContentStore {
    async fn insert_file(&self, user_id: Uuid, input: &NewFileInput) -> AppResult<FileProfile> {
        let file = FileProfile {
            id: Uuid::new_v4(),
            user_id,
            kind: input.kind,
            title: input.title.clone(),
            size_mb: input.size_mb,
            pages: input.pages,
            duration_min: input.duration_min,
            video_url: input.video_url.clone(),
            source_text: input.source_text.clone(),
            created_at: Some(self.next_timestamp()),
        };
        self.files.lock().unwrap().push(file.clone());
        Ok(file)
    }

    async fn get_file(&self, user_id: Uuid, file_id: Uuid) -> AppResult<Option<FileProfile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == file_id && f.user_id == user_id)
            .cloned())
    }

    async fn list_files(&self, user_id: Uuid) -> AppResult<Vec<FileProfile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        text: &str,
    ) -> AppResult<SummaryProfile> {
        let summary = SummaryProfile {
            id: Uuid::new_v4(),
            file_id,
            text: text.to_string(),
            created_at: Some(self.next_timestamp()),
        };
        self.summaries.lock().unwrap().push((user_id, summary.clone()));
        Ok(summary)
    }

    async fn latest_summary(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Option<SummaryProfile>> {
        Ok(self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, s)| *u == user_id && s.file_id == file_id)
            .max_by_key(|(_, s)| s.created_at)
            .map(|(_, s)| s.clone()))
    }

    async fn insert_quiz(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        questions: &serde_json::Value,
    ) -> AppResult<QuizProfile> {
        let quiz = QuizProfile {
            id: Uuid::new_v4(),
            file_id,
            questions: questions.clone(),
            created_at: Some(self.next_timestamp()),
        };
        self.quizzes.lock().unwrap().push((user_id, quiz.clone()));
        Ok(quiz)
    }

    async fn insert_chat_message(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> AppResult<ChatMessageProfile> {
        let message = ChatMessageProfile {
            id: Uuid::new_v4(),
            file_id,
            role,
            content: content.to_string(),
            created_at: Some(self.next_timestamp()),
        };
        self.chat_messages
            .lock()
            .unwrap()
            .push((user_id, message.clone()));
        Ok(message)
    }

    async fn list_chat_messages(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<ChatMessageProfile>> {
        let mut messages: Vec<ChatMessageProfile> = self
            .chat_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, m)| *u == user_id && m.file_id == file_id)
            .map(|(_, m)| m.clone())
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[async_trait]
impl UsageLedger for InMemoryContentStore {
    async fn count_uploads_since(
        &self,
        user_id: Uuid,
        kind: FileKind,
        since: NaiveDateTime,
    ) -> AppResult<i64> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| {
                f.user_id == user_id
                    && f.kind == kind
                    && f.created_at.map(|at| at >= since).unwrap_or(false)
            })
            .count() as i64)
    }

    async fn count_quizzes_since(&self, user_id: Uuid, since: NaiveDateTime) -> AppResult<i64> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, q)| {
                *u == user_id && q.created_at.map(|at| at >= since).unwrap_or(false)
            })
            .count() as i64)
    }

    async fn summary_timestamps(
        &self,
        user_id: Uuid,
        file_id: Uuid,
    ) -> AppResult<Vec<NaiveDateTime>> {
        let mut timestamps: Vec<NaiveDateTime> = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, s)| *u == user_id && s.file_id == file_id)
            .filter_map(|(_, s)| s.created_at)
            .collect();
        timestamps.sort();
        Ok(timestamps)
    }

    async fn count_chat_messages(&self, user_id: Uuid, file_id: Uuid) -> AppResult<i64> {
        Ok(self
            .chat_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, m)| *u == user_id && m.file_id == file_id)
            .count() as i64)
    }
}

// ============================================================================
// Stub Providers
// ============================================================================

/// Canned model output so content flows run without a provider.
#[derive(Default)]
pub struct StubIntelligence;

impl StubIntelligence {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentIntelligence for StubIntelligence {
    async fn summarize(&self, _source_text: &str) -> AppResult<String> {
        Ok("generated summary".to_string())
    }

    async fn answer(
        &self,
        _source_text: &str,
        _history: &[ChatTurn],
        question: &str,
    ) -> AppResult<String> {
        Ok(format!("answer to: {question}"))
    }

    async fn quiz_questions(&self, _source_text: &str) -> AppResult<serde_json::Value> {
        Ok(serde_json::json!([
            {
                "question": "What is the main topic?",
                "options": ["A", "B", "C", "D"],
                "correct_answer": "A"
            }
        ]))
    }
}

/// Fixed transcript for every video URL.
pub struct StubTranscripts {
    title: String,
    duration_min: f64,
    text: String,
}

impl StubTranscripts {
    pub fn new(title: &str, duration_min: f64, text: &str) -> Self {
        Self {
            title: title.to_string(),
            duration_min,
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for StubTranscripts {
    async fn youtube_transcript(&self, _video_url: &str) -> AppResult<YoutubeTranscript> {
        Ok(YoutubeTranscript {
            title: self.title.clone(),
            duration_min: self.duration_min,
            text: self.text.clone(),
        })
    }
}
