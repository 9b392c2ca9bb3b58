//! Cooldown bookkeeping for alert delivery.
//!
//! [`CooldownLedger`] keeps the full record set in memory and writes the
//! complete image back through its [`LedgerStore`] after every change. All
//! mutations go through one async mutex that stays held across the store
//! write, so the scheduler and the retention job can never interleave
//! partial writes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use fundwatch_core::signal::SignalKey;
use fundwatch_core::types::Timestamp;
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::record::SentRecord;
use crate::store::{LedgerStore, MemoryStore};

/// Owner of every [`SentRecord`].
pub struct CooldownLedger {
    store: Arc<dyn LedgerStore>,
    records: Mutex<HashMap<SignalKey, SentRecord>>,
}

impl CooldownLedger {
    /// Load the persisted ledger.
    ///
    /// Never fails: an unreadable ledger is logged and treated as empty so
    /// that a corrupt file cannot block monitoring from starting.
    pub async fn open(store: Arc<dyn LedgerStore>) -> Self {
        let records = match store.load().await {
            Ok(records) => {
                tracing::info!(count = records.len(), "Cooldown ledger loaded");
                records
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cooldown ledger unreadable, starting empty");
                Vec::new()
            }
        };

        Self {
            store,
            records: Mutex::new(index(records)),
        }
    }

    /// An empty ledger backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `venue`/`symbol` may alert now.
    pub async fn can_send(&self, venue: &str, symbol: &str, interval: Duration) -> bool {
        self.can_send_at(venue, symbol, interval, Utc::now()).await
    }

    /// Whether `venue`/`symbol` may alert at `now`.
    ///
    /// True when no record exists or at least `interval` has passed since
    /// the last send. A record stamped in the future is treated as corrupt
    /// and fails open.
    pub async fn can_send_at(
        &self,
        venue: &str,
        symbol: &str,
        interval: Duration,
        now: Timestamp,
    ) -> bool {
        let key = SignalKey::new(venue, symbol);
        let records = self.records.lock().await;

        match records.get(&key) {
            None => true,
            Some(record) if record.last_sent > now => {
                tracing::warn!(
                    key = %key,
                    last_sent = %record.last_sent,
                    "Sent record is in the future, allowing send",
                );
                true
            }
            Some(record) => record.cooled_down(interval, now),
        }
    }

    /// Upsert the record for `venue`/`symbol` and persist the ledger.
    ///
    /// The in-memory record is updated even when the write fails, so the
    /// cooldown still holds for the lifetime of the process.
    pub async fn record_send(
        &self,
        venue: &str,
        symbol: &str,
        sent_at: Timestamp,
    ) -> Result<(), LedgerError> {
        let mut records = self.records.lock().await;

        let record = SentRecord::new(venue, symbol, sent_at);
        records.insert(record.key(), record);

        self.persist(&records).await
    }

    /// Purge records older than `retention`. Returns the number removed.
    pub async fn cleanup(&self, retention: Duration) -> Result<usize, LedgerError> {
        self.cleanup_at(retention, Utc::now()).await
    }

    /// Purge records sent before `now - retention`.
    ///
    /// The store is only rewritten when something was actually removed. A
    /// window reaching past the earliest representable time purges nothing.
    pub async fn cleanup_at(
        &self,
        retention: Duration,
        now: Timestamp,
    ) -> Result<usize, LedgerError> {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            tracing::debug!(
                retention_hours = retention.num_hours(),
                "Retention window exceeds calendar range"
            );
            return Ok(0);
        };
        let mut records = self.records.lock().await;

        let before = records.len();
        records.retain(|_, record| !record.is_older_than(cutoff));
        let purged = before - records.len();

        if purged > 0 {
            self.persist(&records).await?;
        }

        Ok(purged)
    }

    /// Sorted copy of every record.
    pub async fn records(&self) -> Vec<SentRecord> {
        snapshot(&*self.records.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    // ---- private helpers ----

    async fn persist(&self, records: &HashMap<SignalKey, SentRecord>) -> Result<(), LedgerError> {
        self.store.save(&snapshot(records)).await
    }
}

/// Build the key index, keeping the newest record when a key repeats.
fn index(records: Vec<SentRecord>) -> HashMap<SignalKey, SentRecord> {
    let mut map: HashMap<SignalKey, SentRecord> = HashMap::with_capacity(records.len());
    for record in records {
        match map.get(&record.key()) {
            Some(existing) if existing.last_sent >= record.last_sent => {}
            _ => {
                map.insert(record.key(), record);
            }
        }
    }
    map
}

fn snapshot(records: &HashMap<SignalKey, SentRecord>) -> Vec<SentRecord> {
    let mut out: Vec<SentRecord> = records.values().cloned().collect();
    out.sort_by(|a, b| a.venue.cmp(&b.venue).then_with(|| a.symbol.cmp(&b.symbol)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    /// Store whose reads and writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl LedgerStore for BrokenStore {
        async fn load(&self) -> Result<Vec<SentRecord>, LedgerError> {
            Err(LedgerError::Unavailable("disk on fire".into()))
        }

        async fn save(&self, _records: &[SentRecord]) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("disk on fire".into()))
        }
    }

    // -----------------------------------------------------------------------
    // can_send / record_send
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn can_send_without_record() {
        let ledger = CooldownLedger::in_memory();
        assert!(ledger.can_send("Binance", "BTC", Duration::hours(8)).await);
    }

    #[tokio::test]
    async fn cooldown_blocks_until_interval_elapses() {
        let ledger = CooldownLedger::in_memory();
        let interval = Duration::hours(8);
        ledger.record_send("Binance", "BTC", t0()).await.unwrap();

        let almost = t0() + Duration::hours(7) + Duration::minutes(59);
        assert!(!ledger.can_send_at("Binance", "BTC", interval, almost).await);
        assert!(
            ledger
                .can_send_at("Binance", "BTC", interval, t0() + Duration::hours(8))
                .await
        );
    }

    #[tokio::test]
    async fn cooldown_is_per_key() {
        let ledger = CooldownLedger::in_memory();
        ledger.record_send("Binance", "BTC", t0()).await.unwrap();

        let soon = t0() + Duration::minutes(1);
        let interval = Duration::hours(8);
        assert!(ledger.can_send_at("Bybit", "BTC", interval, soon).await);
        assert!(ledger.can_send_at("Binance", "ETH", interval, soon).await);
    }

    #[tokio::test]
    async fn record_send_overwrites_existing_timestamp() {
        let ledger = CooldownLedger::in_memory();
        ledger.record_send("Bybit", "SOL", t0()).await.unwrap();
        let later = t0() + Duration::hours(3);
        ledger.record_send("Bybit", "SOL", later).await.unwrap();

        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_sent, later);
    }

    #[tokio::test]
    async fn record_send_persists_full_image() {
        let store = Arc::new(MemoryStore::new());
        let ledger = CooldownLedger::open(store.clone()).await;

        ledger.record_send("MEXC", "PEPE", t0()).await.unwrap();
        ledger.record_send("Binance", "BTC", t0()).await.unwrap();

        let saved = store.snapshot();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].venue, "Binance");
        assert_eq!(saved[1].venue, "MEXC");
    }

    #[tokio::test]
    async fn future_record_fails_open() {
        let ledger = CooldownLedger::in_memory();
        ledger
            .record_send("Binance", "BTC", t0() + Duration::days(30))
            .await
            .unwrap();
        assert!(
            ledger
                .can_send_at("Binance", "BTC", Duration::hours(8), t0())
                .await
        );
    }

    // -----------------------------------------------------------------------
    // Store failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unreadable_store_opens_empty() {
        let ledger = CooldownLedger::open(Arc::new(BrokenStore)).await;
        assert!(ledger.is_empty().await);
        assert!(ledger.can_send("Binance", "BTC", Duration::hours(8)).await);
    }

    #[tokio::test]
    async fn failed_write_still_updates_memory() {
        let ledger = CooldownLedger::open(Arc::new(BrokenStore)).await;
        let result = ledger.record_send("Binance", "BTC", t0()).await;

        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
        assert!(
            !ledger
                .can_send_at("Binance", "BTC", Duration::hours(8), t0())
                .await
        );
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn duplicate_keys_on_load_keep_newest() {
        let newer = t0() + Duration::hours(2);
        let store = Arc::new(MemoryStore::with_records(vec![
            SentRecord::new("Binance", "BTC", newer),
            SentRecord::new("Binance", "BTC", t0()),
        ]));
        let ledger = CooldownLedger::open(store).await;

        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_sent, newer);
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cleanup_purges_only_expired_records() {
        let ledger = CooldownLedger::in_memory();
        ledger.record_send("Binance", "OLD", t0()).await.unwrap();
        ledger
            .record_send("Binance", "NEW", t0() + Duration::hours(20))
            .await
            .unwrap();

        let now = t0() + Duration::hours(25);
        let purged = ledger.cleanup_at(Duration::hours(24), now).await.unwrap();

        assert_eq!(purged, 1);
        let records = ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "NEW");
    }

    #[tokio::test]
    async fn cleanup_with_unrepresentable_cutoff_purges_nothing() {
        let ledger = CooldownLedger::in_memory();
        ledger.record_send("Bybit", "OLD", t0()).await.unwrap();

        let purged = ledger
            .cleanup_at(Duration::hours(1_000_000_000_000), t0())
            .await
            .unwrap();

        assert_eq!(purged, 0);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let ledger = CooldownLedger::in_memory();
        ledger.record_send("Binance", "OLD", t0()).await.unwrap();
        ledger
            .record_send("Bybit", "KEEP", t0() + Duration::hours(10))
            .await
            .unwrap();

        let now = t0() + Duration::hours(30);
        ledger.cleanup_at(Duration::hours(24), now).await.unwrap();
        let after_first = ledger.records().await;

        let purged = ledger.cleanup_at(Duration::hours(24), now).await.unwrap();
        assert_eq!(purged, 0);
        assert_eq!(ledger.records().await, after_first);
    }

    #[tokio::test]
    async fn cleanup_without_changes_does_not_write() {
        let ledger = CooldownLedger::open(Arc::new(BrokenStore)).await;
        // Nothing to purge, so the failing store is never touched.
        assert_eq!(
            ledger.cleanup_at(Duration::hours(24), t0()).await.unwrap(),
            0
        );
    }
}
