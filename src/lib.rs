//! UptimeGuard -- uptime monitoring dashboard backend.
//!
//! This crate provides the metrics simulator, threshold-driven incident
//! detection, maintenance mode, deployment risk scoring, and the HTTP API
//! that serves them.

pub mod api;
pub mod auth;
pub mod config;
pub mod detect;
pub mod maintenance;
pub mod monitor;
pub mod predict;
pub mod simulator;
pub mod storage;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::detect::IncidentManager;
use crate::maintenance::MaintenanceStore;
use crate::monitor::LiveMetrics;
use crate::simulator::MetricsSimulator;

/// Open storage, seed the admin account and maintenance row, and build the
/// shared application state.
pub fn bootstrap(config: &Config) -> Result<AppState> {
    tracing::info!(db_path = %config.storage.db_path, "Initializing database");
    let pool = storage::open_pool(&config.storage.db_path)?;

    let state = AppState::new(
        pool.clone(),
        LiveMetrics::new(
            build_simulator(config.simulator.seed),
            MaintenanceStore::new(pool.clone()),
            IncidentManager::new(pool),
        ),
        TokenIssuer::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_expire_minutes,
        ),
    );

    state
        .users
        .ensure_user(
            &config.auth.admin_email,
            &config.auth.admin_password,
            config.auth.bcrypt_cost,
        )
        .context("failed to create admin user")?;
    state
        .maintenance
        .get()
        .context("failed to initialise maintenance state")?;

    Ok(state)
}

fn build_simulator(seed: Option<u64>) -> MetricsSimulator {
    match seed {
        Some(seed) => {
            tracing::info!(seed, "Using seeded metrics simulator");
            MetricsSimulator::seeded(seed)
        }
        None => MetricsSimulator::from_entropy(),
    }
}

/// Start the UptimeGuard server: API, plus the background poller when enabled.
pub async fn serve(config: Config) -> Result<()> {
    if config.auth.jwt_secret == config::AuthConfig::default().jwt_secret {
        tracing::warn!("auth.jwt_secret is the built-in default; set a real secret");
    }

    let state = tokio::task::spawn_blocking({
        let config = config.clone();
        move || bootstrap(&config)
    })
    .await??;

    if config.simulator.poll_interval_secs > 0 {
        let live = state.live.clone();
        let period = Duration::from_secs(config.simulator.poll_interval_secs);
        tokio::spawn(async move {
            monitor::run_monitor_loop(live, period).await;
        });
    }

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
    let app = api::router(state, &config.server.cors_origins);

    tracing::info!(%addr, "UptimeGuard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
