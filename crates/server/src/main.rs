use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use userdir_bus::BusProducer;
use userdir_service::UserService;
use userdir_store::Store;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    userdir_shared::bootstrap::init_env();

    let _guard = init_tracing()?;

    tracing::info!("Starting user directory unified server");

    let config = config::UnifiedConfig::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = userdir_shared::bootstrap::init_db(&config.core).await?;

    userdir_shared::bootstrap::run_migrations(&pool).await?;

    let shutdown = CancellationToken::new();

    let api_handle = spawn_api(pool.clone(), config.clone(), shutdown.clone());
    let dispatcher_handle = spawn_dispatcher(pool.clone(), config.clone(), shutdown.clone());

    tracing::info!("All services started");

    wait_for_shutdown().await;
    tracing::info!("Shutdown signal received");

    shutdown.cancel();

    let _ = tokio::join!(api_handle, dispatcher_handle);

    tracing::info!("All services stopped gracefully");
    Ok(())
}

fn spawn_api(
    pool: PgPool,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let service = Arc::new(UserService::new(Store::new(pool.clone()), config.core.clone()));
        let state = userdir_api::AppState { pool, service };
        let api_config = config.to_api_config();

        tokio::select! {
            result = userdir_api::run_api(state, &api_config) => {
                tracing::error!("API service exited: {:?}", result);
                result.map_err(|e| anyhow::anyhow!(e))
            }
            _ = shutdown.cancelled() => {
                tracing::info!("API service shutting down");
                Ok(())
            }
        }
    })
}

fn spawn_dispatcher(
    pool: PgPool,
    config: config::UnifiedConfig,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let producer = BusProducer::new(&config.core.kafka_bootstrap_servers)?;
        let dispatcher_config = config.to_dispatcher_config();

        userdir_dispatcher::run_dispatcher(pool, producer, dispatcher_config, shutdown).await
    })
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing() -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,userdir_api=debug,userdir_dispatcher=debug,sqlx=warn".into());

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let enable_file_logging = std::env::var("ENABLE_FILE_LOGGING")
        .map(|v| v.to_lowercase() != "false" && v != "0")
        .unwrap_or(true);

    if enable_file_logging {
        let file_appender = tracing_appender::rolling::daily("logs", "userdir.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking)
            .json();

        registry.with(file_layer).init();

        Ok(Some(guard))
    } else {
        registry.init();
        Ok(None)
    }
}
