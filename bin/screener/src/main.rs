use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{CandleFetcher, Config, Signal, SignalStore};
use engine::{ScreeningScheduler, SqliteSignalStore, UpbitClient};
use strategy::ScreeningFileConfig;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let screening = ScreeningFileConfig::load(&cfg.screening_config_path);
    info!(
        upbit = %cfg.upbit_base_url,
        quote = %screening.universe.quote_currency,
        "Screener starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to database: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("Database migration failed: {e}"));
    info!("Database ready");

    // ── Exchange client ───────────────────────────────────────────────────────
    let fetcher: Arc<dyn CandleFetcher> = match UpbitClient::new(cfg.upbit_base_url.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => panic!("Failed to build Upbit client: {e}"),
    };

    // ── Signal sinks ──────────────────────────────────────────────────────────
    let signal_store = SqliteSignalStore::new(db.clone());
    let (signal_tx, _) = broadcast::channel::<Signal>(256);

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let scheduler = ScreeningScheduler::new(
        screening,
        fetcher,
        Arc::new(signal_store.clone()) as Arc<dyn SignalStore>,
        signal_tx.clone(),
    );

    // ── Dashboard API ─────────────────────────────────────────────────────────
    let api_state = api::AppState {
        store: signal_store,
        dashboard_token: cfg.dashboard_token.clone(),
        signal_tx,
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.dashboard_port;
    tokio::spawn(scheduler.run());
    tokio::spawn(api::serve(api_state, port));

    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
    db.close().await;
}
