//! The durable-backed index of all cache entries
//!
//! A [`Manifest`] holds the authoritative in-memory map from cache key to
//! [`Entry`], mirrored to the metadata file on demand rather than on every
//! mutation. A high-frequency cache write therefore costs one map insert;
//! durability comes from an explicit [`Manifest::write`] (or the engine's
//! flush-on-drop).
//!
//! A corrupt metadata file degrades to an empty manifest — everything
//! becomes a cache miss, the caller never sees a failure.

use crate::entry::{DurableEntry, Entry};
use crate::store::FileStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory mapping from cache key to entry, mirrored to the metadata
/// file on [`read`](Manifest::read)/[`write`](Manifest::write).
///
/// All operations, including read and write, serialize through one lock.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entry map.
    ///
    /// A poisoned lock only means another thread panicked mid-mutation;
    /// the map itself is still a valid map, so recover it.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload the in-memory map from the metadata file.
    ///
    /// Malformed JSON or an ill-typed record logs the condition and resets
    /// to an empty manifest instead of failing the caller. Only real I/O
    /// failures (permissions, devices) propagate.
    pub fn read(&self, files: &FileStore) -> Result<()> {
        let mut entries = self.entries();
        entries.clear();

        let text = files.read_manifest()?;
        let records: HashMap<String, DurableEntry> = match serde_json::from_str(&text) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "invalidly formatted manifest, resetting");
                return Ok(());
            }
        };

        for (key, record) in records {
            match Entry::from_durable(record) {
                Ok(entry) => {
                    entries.insert(key, entry);
                }
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "invalid manifest entry, resetting");
                    entries.clear();
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Serialize the full in-memory map to the metadata file, overwriting
    /// it. Materialized values are stripped; only metadata is written.
    pub fn write(&self, files: &FileStore) -> Result<()> {
        let entries = self.entries();
        let records: HashMap<&String, DurableEntry> = entries
            .iter()
            .map(|(key, entry)| (key, entry.to_durable()))
            .collect();
        let text = serde_json::to_string(&records)
            .map_err(|e| Error::format(format!("failed to serialize manifest: {e}")))?;
        files.write_manifest(&text)
    }

    /// Look up an entry by key. Pure map access, no I/O.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Entry> {
        self.entries().get(key).cloned()
    }

    /// Insert or replace the entry stored under `key`.
    pub fn set(&self, key: impl Into<String>, entry: Entry) -> Entry {
        self.entries().insert(key.into(), entry.clone());
        entry
    }

    /// Remove and return the entry stored under `key`.
    pub fn pop(&self, key: &str) -> Result<Entry> {
        self.entries()
            .remove(key)
            .ok_or_else(|| Error::not_found(key))
    }

    /// Empty the in-memory map. Durable storage is untouched.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of entries currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the manifest holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
