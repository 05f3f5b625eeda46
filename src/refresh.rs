use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::normalize::normalize;
use crate::store::{RecordStore, StorageError};
use crate::upstream::{BalanceProvider, Truncation, UpstreamError};

#[derive(thiserror::Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Runs the fetch → normalize → upsert cycle, on demand or on a schedule.
pub struct Refresher {
    client: Arc<dyn BalanceProvider>,
    store: Arc<dyn RecordStore>,
    window_hours: u64,
}

impl Refresher {
    pub fn new(
        client: Arc<dyn BalanceProvider>,
        store: Arc<dyn RecordStore>,
        window_hours: u64,
    ) -> Self {
        Self {
            client,
            store,
            window_hours,
        }
    }

    /// One pass over an explicit range. Each bucket is upserted independently,
    /// so a failure partway through leaves the earlier upserts in place.
    pub async fn run_cycle(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        truncation: Truncation,
    ) -> Result<usize, RefreshError> {
        let payload = self.client.fetch_balance(start, end, truncation).await?;
        let categories = payload.validate();
        let buckets = normalize(&categories);

        let mut upserted = 0;
        for record in buckets.values() {
            self.store.upsert(record).await?;
            upserted += 1;
        }

        metrics::counter!("refresh_cycles_total").increment(1);
        tracing::info!(records = upserted, "refresh cycle complete");
        Ok(upserted)
    }

    /// Default policy: the most recent window at hourly granularity.
    pub async fn run_recent_window(&self) -> Result<usize, RefreshError> {
        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::hours(self.window_hours as i64);
        self.run_cycle(start, end, Truncation::Hour).await
    }

    /// Supervised loop: one cycle right away (the interval's first tick fires
    /// immediately), then one per tick until the token is cancelled. A failed
    /// cycle is logged and skipped; it never takes the process down.
    pub async fn run_periodic(&self, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("refresh task stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_recent_window().await {
                        metrics::counter!("refresh_failures_total").increment(1);
                        tracing::error!(error = %e, "refresh cycle failed, skipping");
                    }
                }
            }
        }
    }
}
