use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::use_cases::{
        content::{ContentRepo, ContentUseCases},
        entitlement::{EntitlementUseCases, UsageLedger},
        lifecycle::{SubscriptionLifecycleUseCases, SubscriptionRepo},
        plan_catalog::{PlanCatalogUseCases, PlanRepo},
        user::UserRepo,
    },
    infra::{
        assistant_client::AssistantClient, config::AppConfig, db::init_pool,
        polar_client::PolarClient, transcript_client::TranscriptClient,
    },
};

pub async fn init_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let pool = init_pool(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let plan_repo_arc = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let subscription_repo_arc = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserRepo>;
    let content_repo_arc = postgres_arc.clone() as Arc<dyn ContentRepo>;
    let ledger_arc = postgres_arc.clone() as Arc<dyn UsageLedger>;

    let billing = Arc::new(PolarClient::new(
        config.polar_api_base.clone(),
        config.polar_api_key.clone(),
        config.polar_webhook_secret.clone(),
    ));
    let transcripts = Arc::new(TranscriptClient::new(config.transcript_api_base.clone()));
    let intelligence = Arc::new(AssistantClient::new(
        config.assistant_api_base.clone(),
        config.assistant_api_key.clone(),
        config.assistant_model.clone(),
    ));

    let plan_catalog = PlanCatalogUseCases::new(plan_repo_arc.clone());
    let lifecycle = SubscriptionLifecycleUseCases::new(
        subscription_repo_arc.clone(),
        plan_catalog.clone(),
        user_repo_arc.clone(),
        billing.clone(),
    );
    let entitlement = EntitlementUseCases::new(
        subscription_repo_arc,
        plan_catalog.clone(),
        ledger_arc,
    );
    let content = ContentUseCases::new(
        content_repo_arc,
        entitlement.clone(),
        intelligence,
        transcripts,
    );

    // Make sure the free tier exists before the first signup needs it.
    plan_catalog.get_or_create_free_plan().await?;

    Ok(AppState {
        plan_catalog,
        lifecycle,
        entitlement,
        content,
        user_repo: user_repo_arc,
        billing,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "studybite=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
