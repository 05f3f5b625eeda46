use time::OffsetDateTime;

use crate::domain::BalanceRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{connect_with_retry, PostgresStore};

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("storage query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Persistence seam for balance records. Upsert matches on `ts` alone with
/// full-replace semantics; range queries are inclusive on both bounds and
/// ordered ascending.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert(&self, record: &BalanceRecord) -> Result<(), StorageError>;

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<BalanceRecord>, StorageError>;
}
