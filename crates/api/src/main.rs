//! User Directory API Server
//!
//! Axum-based HTTP+JSON front end over the user directory's RPC surface
//! (add/remove/update/list users) plus liveness/readiness probes and
//! OpenAPI/Swagger docs.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userdir_api::{AppState, config, run_api};
use userdir_core::config::CoreConfig;
use userdir_service::UserService;
use userdir_store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,userdir_api=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting user directory API server");

    let core_config = CoreConfig::from_env()?;
    let api_config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(core_config.db_max_connections)
        .connect(&core_config.database_url)
        .await?;
    tracing::info!("Database connection pool established");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations completed");

    let service = Arc::new(UserService::new(Store::new(pool.clone()), core_config));
    let state = AppState { pool, service };

    run_api(state, &api_config).await?;

    Ok(())
}
