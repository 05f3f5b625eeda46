use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use time::OffsetDateTime;

use crate::domain::BalanceRecord;
use crate::store::{RecordStore, StorageError};

/// Connects to the backing store with a fixed backoff and a bounded number of
/// attempts. Exhaustion returns the last error; the host decides whether that
/// is fatal.
pub async fn connect_with_retry(
    uri: &str,
    max_connections: u32,
    max_attempts: u32,
    backoff: Duration,
) -> Result<PgPool, StorageError> {
    let mut attempt: u32 = 1;
    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    "storage connect failed, retrying with backoff"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "storage connect failed, giving up");
                return Err(StorageError::Connect(e));
            }
        }
    }
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the schema. Safe to run on every startup.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS balance_record (
                ts          TIMESTAMPTZ PRIMARY KEY,
                generation  DOUBLE PRECISION NOT NULL,
                demand      DOUBLE PRECISION NOT NULL,
                imports     DOUBLE PRECISION NOT NULL,
                exports     DOUBLE PRECISION NOT NULL,
                breakdown   JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresStore {
    async fn upsert(&self, record: &BalanceRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO balance_record (ts, generation, demand, imports, exports, breakdown)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (ts) DO UPDATE SET
                generation = EXCLUDED.generation,
                demand     = EXCLUDED.demand,
                imports    = EXCLUDED.imports,
                exports    = EXCLUDED.exports,
                breakdown  = EXCLUDED.breakdown
            "#,
        )
        .bind(record.ts)
        .bind(record.generation)
        .bind(record.demand)
        .bind(record.imports)
        .bind(record.exports)
        .bind(Json(&record.breakdown))
        .execute(&self.pool)
        .await?;

        metrics::counter!("records_upserted_total").increment(1);
        Ok(())
    }

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<BalanceRecord>, StorageError> {
        let rows = sqlx::query_as::<_, BalanceRecord>(
            r#"
            SELECT ts, generation, demand, imports, exports, breakdown
            FROM balance_record
            WHERE ts >= $1 AND ts <= $2
            ORDER BY ts
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
