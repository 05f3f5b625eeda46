use anyhow::{Context, Result};
use balance_service::{
    api,
    config::AppConfig,
    metrics_server, observability,
    refresh::Refresher,
    store::{self, PostgresStore, RecordStore},
    upstream::BalanceClient,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Storage is mandatory: bounded retry with fixed backoff, then give up and
    // let the process exit with the error.
    let pool = store::connect_with_retry(
        &cfg.storage.uri,
        cfg.storage.max_connections,
        cfg.storage.connect_max_attempts,
        Duration::from_millis(cfg.storage.connect_backoff_ms),
    )
    .await
    .context("could not connect to the record store")?;

    let store = Arc::new(PostgresStore::new(pool));
    store.ensure_schema().await?;

    let client = BalanceClient::new(
        cfg.upstream.base_url.clone(),
        Duration::from_secs(cfg.upstream.timeout_secs),
    )?;

    // Query API runs alongside the refresh loop.
    let api_state = api::ApiState {
        store: store.clone() as Arc<dyn RecordStore>,
    };
    let bind_addr = cfg.api.bind_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = api::serve(&bind_addr, api_state).await {
            tracing::error!(error = %e, "query api server error");
        }
    });

    let refresher = Refresher::new(Arc::new(client), store, cfg.refresh.window_hours);
    let token = CancellationToken::new();
    let refresh_task = {
        let token = token.clone();
        let period = Duration::from_secs(cfg.refresh.interval_secs);
        tokio::spawn(async move { refresher.run_periodic(period, token).await })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    token.cancel();
    refresh_task.await?;

    Ok(())
}
