mod api;
mod middleware;
mod wiring;

use std::sync::Arc;
use std::time::Duration;

use stintel_core::PersistenceGateway;
use stintel_pipeline::IntelligenceService;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = stintel_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "configuration loaded");

    let pool_config = stintel_db::PoolConfig::from_app_config(&config);
    let pool = stintel_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = stintel_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let gateway: Arc<dyn PersistenceGateway> = Arc::new(stintel_db::PgGateway::new(pool));
    let runner = wiring::build_runner(&config, gateway)?;
    let service = Arc::new(IntelligenceService::with_error_backoff(
        Arc::new(runner),
        config.default_days_back,
        Duration::from_secs(config.scheduler_error_backoff_secs),
    ));

    if let Some(frequency) = config.schedule_on_startup {
        let status =
            service.start_scheduler(frequency, config.schedule_interval_secs, false)?;
        tracing::info!(frequency = %frequency, next_run = ?status.next_run, "scheduler started from configuration");
    }

    let auth = AuthState::from_env(matches!(config.env, stintel_core::Environment::Development))?;
    let app = build_app(
        AppState {
            service: Arc::clone(&service),
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if service.scheduler_status().is_running {
        service.stop_scheduler()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
