//! Persistence backends for the cooldown ledger.
//!
//! A store only ever sees the complete record set: [`LedgerStore::save`]
//! replaces the whole image, so a reader never observes half a write.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::LedgerError;
use crate::record::SentRecord;

/// Default file name for the JSON ledger.
pub const DEFAULT_LEDGER_FILE: &str = "sent_signals.json";

/// Durable home of the ledger's record set.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load every persisted record. A missing ledger is an empty ledger.
    async fn load(&self) -> Result<Vec<SentRecord>, LedgerError>;

    /// Atomically replace the persisted image with `records`.
    async fn save(&self, records: &[SentRecord]) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Pretty-printed JSON array on disk.
///
/// Writes go to `<path>.tmp` first and are then renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl LedgerStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<SentRecord>, LedgerError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, records: &[SentRecord]) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<SentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store as if a previous run had persisted `records`.
    pub fn with_records(records: Vec<SentRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Copy of the last saved image.
    pub fn snapshot(&self) -> Vec<SentRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self) -> Result<Vec<SentRecord>, LedgerError> {
        Ok(self.snapshot())
    }

    async fn save(&self, records: &[SentRecord]) -> Result<(), LedgerError> {
        let mut guard = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = records.to_vec();
        Ok(())
    }
}
