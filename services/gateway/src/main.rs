mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod rate_limit;
mod router;
mod state;

use anyhow::Context;
use chrono::TimeDelta;
use clap::Parser;
use config::Config;
use mockable::DefaultClock;
use rate_limit::RateLimiter;
use router::create_router;
use state::{AppState, Stores};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use vending_engine::SessionAuthority;

const IDLE_BUCKET_AGE: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    tracing::info!(bind_addr = %config.bind_addr, "Starting vending gateway");

    let stores = match &config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "opening journaled stores");
            Stores::open(dir).context("failed to open stores")?
        }
        None => {
            tracing::warn!("no data directory configured, state is kept in memory only");
            Stores::in_memory()
        }
    };

    let state = AppState::new(
        stores,
        config.token_secret.as_bytes(),
        TimeDelta::seconds(i64::from(config.session_ttl_secs)),
        Arc::new(DefaultClock),
        config.cookie_secure,
    );

    let sweeper = tokio::spawn(sweep(
        state.sessions.clone(),
        state.rate_limiter.clone(),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
    ));

    let app = create_router(state);
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Gateway stopped");
    Ok(())
}

/// Evict expired sessions and idle rate-limit buckets so neither table grows
/// with abandoned clients.
async fn sweep(sessions: Arc<SessionAuthority>, limiter: Arc<RateLimiter>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let dropped = limiter.purge_idle(IDLE_BUCKET_AGE);
        if dropped > 0 {
            tracing::debug!(dropped, "idle rate-limit buckets dropped");
        }
        let sessions = sessions.clone();
        match tokio::task::spawn_blocking(move || sessions.purge_expired()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "session sweep failed"),
            Err(e) => tracing::warn!(error = %e, "session sweep task failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
