use anyhow::Context;
use log::info;
use std::sync::Arc;

use hcmserver::api_router::configure_api_routes;
use hcmserver::auth::InMemoryUserRepository;
use hcmserver::shared::config::AppConfig;
use hcmserver::shared::state::AppState;
use hcmserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database).context("failed to create database pool")?;
    {
        let mut conn = pool.get().context("failed to check out connection")?;
        run_migrations(&mut conn)?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState {
        conn: pool,
        config,
        users: Arc::new(InMemoryUserRepository::demo()),
    });

    let app = configure_api_routes(state);

    info!("directory server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
