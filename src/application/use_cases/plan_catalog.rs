use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::plan::{FREE_PLAN_NAME, Plan};

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;

    async fn get_by_name(&self, name: &str) -> AppResult<Option<Plan>>;

    /// Lookup by the external billing-provider plan id.
    async fn get_by_polar_plan_id(&self, polar_plan_id: &str) -> AppResult<Option<Plan>>;

    /// All plans ordered by price ascending, for the pricing page.
    async fn list_by_price(&self) -> AppResult<Vec<Plan>>;

    /// Persist a plan. Implementations store the row as given; callers are
    /// expected to normalize first (see [`PlanCatalogUseCases::save_plan`]).
    async fn save(&self, plan: &Plan) -> AppResult<Plan>;

    /// Insert unless a plan with the same name exists. Used by the free-plan
    /// bootstrap so a concurrent first-time creation yields one canonical
    /// row (the name column is unique).
    async fn insert_if_absent(&self, plan: &Plan) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PlanCatalogUseCases {
    repo: Arc<dyn PlanRepo>,
}

impl PlanCatalogUseCases {
    pub fn new(repo: Arc<dyn PlanRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<Plan>> {
        self.repo.get_by_id(id).await
    }

    pub async fn get_by_polar_plan_id(&self, polar_plan_id: &str) -> AppResult<Option<Plan>> {
        self.repo.get_by_polar_plan_id(polar_plan_id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Plan>> {
        self.repo.list_by_price().await
    }

    /// Every save goes through free-tier normalization, so a row named
    /// "free" can never end up priced or attached to a billing id.
    #[instrument(skip(self, plan), fields(plan_name = %plan.name))]
    pub async fn save_plan(&self, mut plan: Plan) -> AppResult<Plan> {
        plan.normalize();
        self.repo.save(&plan).await
    }

    /// Lookup-or-create for the free plan. Tolerates racing creators: the
    /// insert is conditional on the unique name, and whoever loses the race
    /// reads back the canonical row.
    #[instrument(skip(self))]
    pub async fn get_or_create_free_plan(&self) -> AppResult<Plan> {
        if let Some(plan) = self.repo.get_by_name(FREE_PLAN_NAME).await? {
            return Ok(plan);
        }

        let mut seeded = Plan::free_defaults();
        seeded.normalize();
        self.repo.insert_if_absent(&seeded).await?;

        self.repo
            .get_by_name(FREE_PLAN_NAME)
            .await?
            .ok_or_else(|| AppError::Internal("free plan missing after bootstrap".to_string()))
    }
}
