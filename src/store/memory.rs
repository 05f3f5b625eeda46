use std::collections::BTreeMap;

use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::domain::BalanceRecord;
use crate::store::{RecordStore, StorageError};

/// In-memory store with the same semantics as the Postgres table: keyed by
/// `ts`, full-replace upsert, inclusive ascending range queries. Backs the
/// tests and doubles as an ephemeral backend.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<OffsetDateTime, BalanceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, record: &BalanceRecord) -> Result<(), StorageError> {
        self.records.lock().await.insert(record.ts, record.clone());
        Ok(())
    }

    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<BalanceRecord>, StorageError> {
        // BTreeMap::range panics on a reversed range; a reversed query is
        // simply empty, matching the Postgres backend.
        if start > end {
            return Ok(Vec::new());
        }
        let records = self.records.lock().await;
        Ok(records.range(start..=end).map(|(_, r)| r.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(ts: OffsetDateTime, generation: f64) -> BalanceRecord {
        BalanceRecord {
            generation,
            ..BalanceRecord::empty(ts)
        }
    }

    #[tokio::test]
    async fn upsert_replaces_on_equal_timestamp() {
        let store = MemoryStore::new();
        let ts = datetime!(2023-01-01 00:00:00 UTC);

        store.upsert(&record(ts, 1.0)).await.expect("upsert");
        store.upsert(&record(ts, 2.0)).await.expect("upsert");

        let got = store.query_range(ts, ts).await.expect("query");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].generation, 2.0);
    }

    #[tokio::test]
    async fn query_range_is_inclusive_and_sorted() {
        let store = MemoryStore::new();
        let days = [
            datetime!(2023-01-01 00:00:00 UTC),
            datetime!(2023-01-02 00:00:00 UTC),
            datetime!(2023-01-03 00:00:00 UTC),
            datetime!(2023-01-04 00:00:00 UTC),
        ];
        // Insert out of order; the range must still come back ascending.
        for &ts in &[days[2], days[0], days[3], days[1]] {
            store.upsert(&record(ts, 1.0)).await.expect("upsert");
        }

        let got = store.query_range(days[0], days[2]).await.expect("query");
        let timestamps: Vec<_> = got.iter().map(|r| r.ts).collect();
        assert_eq!(timestamps, vec![days[0], days[1], days[2]]);
    }

    #[tokio::test]
    async fn reversed_range_is_empty_not_a_panic() {
        let store = MemoryStore::new();
        let ts = datetime!(2023-01-15 00:00:00 UTC);
        store.upsert(&record(ts, 1.0)).await.expect("upsert");

        let got = store
            .query_range(
                datetime!(2023-02-01 00:00:00 UTC),
                datetime!(2023-01-01 00:00:00 UTC),
            )
            .await
            .expect("query");
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn degenerate_range_returns_the_single_match() {
        let store = MemoryStore::new();
        let ts = datetime!(2023-01-15 00:00:00 UTC);
        store.upsert(&record(ts, 1.0)).await.expect("upsert");

        let got = store.query_range(ts, ts).await.expect("query");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].ts, ts);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_sequence() {
        let store = MemoryStore::new();
        let got = store
            .query_range(
                datetime!(2023-01-01 00:00:00 UTC),
                datetime!(2023-12-31 00:00:00 UTC),
            )
            .await
            .expect("query");
        assert!(got.is_empty());
    }
}
