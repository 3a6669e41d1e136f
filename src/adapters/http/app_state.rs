use std::sync::Arc;

use crate::{
    application::ports::billing_provider::BillingProviderPort,
    application::use_cases::{
        content::ContentUseCases, entitlement::EntitlementUseCases,
        lifecycle::SubscriptionLifecycleUseCases, plan_catalog::PlanCatalogUseCases,
        user::UserRepo,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub plan_catalog: PlanCatalogUseCases,
    pub lifecycle: SubscriptionLifecycleUseCases,
    pub entitlement: EntitlementUseCases,
    pub content: ContentUseCases,
    pub user_repo: Arc<dyn UserRepo>,
    pub billing: Arc<dyn BillingProviderPort>,
}
