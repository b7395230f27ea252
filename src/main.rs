// =============================================================================
// TradeDesk Analytics — Main Entry Point
// =============================================================================
//
// Charting backend for the trading dashboard: indicator series, chart-pattern
// matching, technical summaries, crossover backtests and option Greeks over
// candles pulled from the dashboard's historical-data endpoint.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod backtest;
mod indicators;
mod market_data;
mod options;
mod patterns;
mod runtime_config;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "runtime_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        TradeDesk Analytics — Starting Up                 ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env(|name| std::env::var(name).ok());

    info!(
        symbols = ?config.watchlist.symbols,
        interval = %config.watchlist.interval,
        upstream = %config.upstream.base_url,
        "Configured watchlist"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let bind_addr = config.server.bind_addr.clone();
    let refresh_secs = config.watchlist.refresh_secs;
    let state = Arc::new(AppState::new(config)?);

    // ── 3. Watchlist refresh loop ────────────────────────────────────────
    if refresh_secs > 0 {
        let refresh_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(refresh_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                market_data::refresh_watchlist(&refresh_state).await;
            }
        });
        info!(every_secs = refresh_secs, "Watchlist refresh loop launched");
    } else {
        info!("Watchlist refresh disabled (refresh_secs = 0)");
    }

    // ── 4. API server with graceful shutdown ─────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    // ── 5. Persist config ────────────────────────────────────────────────
    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("TradeDesk Analytics shut down complete.");
    Ok(())
}
