use dotenvy::dotenv;
use tracing::info;

use studybite::infra::{app::create_app, config::AppConfig, setup::init_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    let app_state = init_app_state(&config).await?;

    let app = create_app(app_state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
