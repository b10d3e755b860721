// src/storage/record_store.rs
//! Persistence for DID records.
//!
//! The engine consumes storage through the [`RecordStore`] trait and never
//! assumes a backend. Two implementations are provided:
//! - [`FileStore`]: one JSON document per DID under a configurable
//!   directory, used by the CLI
//! - [`MemoryStore`]: a hashmap behind a mutex, used in tests
//!
//! # Note
//! Records contain private key material; a production deployment should
//! point [`FileStore`] at a directory with restricted permissions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::models::did::DidRecord;

/// Errors produced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure.
    #[error("record storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record failed to encode or decode.
    #[error("record format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key/value persistence for DID records, keyed by DID id.
pub trait RecordStore {
    /// Stores a record, replacing any previous version.
    fn save(&self, record: &DidRecord) -> Result<(), StoreError>;

    /// Loads the record for a DID id, or `None` if absent.
    fn load(&self, id: &str) -> Result<Option<DidRecord>, StoreError>;

    /// Lists the ids of all stored records.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// File-backed record store: `<root>/<id-without-method-prefix>.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at the given directory. The directory is
    /// created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        // Stored file names drop the method prefix; the remaining PLC
        // identifier is plain base32 and filesystem-safe.
        let name = id.strip_prefix("did:plc:").unwrap_or(id);
        self.root.join(format!("{name}.json"))
    }
}

impl RecordStore for FileStore {
    fn save(&self, record: &DidRecord) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.record_path(&record.id);
        let encoded = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, encoded)?;
        log::debug!("saved DID record to {}", path.display());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<DidRecord>, StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let encoded = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&encoded)?))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Ok(encoded) = std::fs::read_to_string(&path) {
                    if let Ok(record) = serde_json::from_str::<DidRecord>(&encoded) {
                        ids.push(record.id);
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-memory record store for tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, DidRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl RecordStore for MemoryStore {
    fn save(&self, record: &DidRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<DidRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.records.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
