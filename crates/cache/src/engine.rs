//! The cache engine
//!
//! [`Cache`] orchestrates per-call resolution across the two tiers: the
//! process-local memory table and the durable manifest + data files. A
//! [`Cache::resolve`] call either returns a previously computed value or
//! invokes the supplied computation and commits the result to both tiers.
//!
//! One engine exclusively owns one [`Manifest`] and one [`FileStore`] for
//! its lifetime. There is no implicit global instance; construct a cache
//! and pass it where it is needed.
//!
//! Per-key resolution is deliberately not atomic across its steps: two
//! threads racing on the same uncached key may both compute, and the last
//! writer to each tier wins. The value tiers themselves are lock-guarded.

use crate::codec::Codec;
use crate::entry::{Entry, Materialized};
use crate::manifest::Manifest;
use crate::store::{FileStore, ROOT_DIR};
use crate::{Error, Result};
use chrono::Duration;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-call resolution options.
///
/// Persistence is enabled by supplying a [`Codec`] via
/// [`persist`](ResolveOptions::persist); everything else defaults to a
/// memory-only, never-expiring, non-reloading resolve.
pub struct ResolveOptions<'a, T> {
    reload: bool,
    expiration: Option<Duration>,
    extension: String,
    namer: Option<Box<dyn FnOnce() -> String + 'a>>,
    codec: Option<&'a dyn Codec<T>>,
}

impl<T> Default for ResolveOptions<'_, T> {
    fn default() -> Self {
        Self {
            reload: false,
            expiration: None,
            extension: String::new(),
            namer: None,
            codec: None,
        }
    }
}

impl<'a, T> ResolveOptions<'a, T> {
    /// Memory-only resolution with no expiration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the result durably, encoding data files with `codec`.
    #[must_use]
    pub fn persist(mut self, codec: &'a dyn Codec<T>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Expire the cached value `expiration` after it was computed.
    #[must_use]
    pub fn expire_after(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Bypass all cached tiers and recompute unconditionally.
    #[must_use]
    pub fn reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    /// Extension appended to generated data-file names.
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Name the data file explicitly instead of randomly.
    ///
    /// The closure runs only when a persisting miss actually writes a
    /// file; the configured extension is appended to its result.
    #[must_use]
    pub fn named(mut self, namer: impl FnOnce() -> String + 'a) -> Self {
        self.namer = Some(Box::new(namer));
        self
    }

    fn persistent(&self) -> bool {
        self.codec.is_some()
    }
}

/// A two-tier memoization cache: a process-local memory table backed by a
/// durable manifest and per-entry data files.
#[derive(Debug)]
pub struct Cache {
    files: FileStore,
    manifest: Manifest,
    memory: Mutex<HashMap<String, Entry>>,
    persist_used: AtomicBool,
}

impl Cache {
    /// Open a cache rooted at `<cwd>/cached`.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::configuration(format!("cannot resolve working directory: {e}")))?;
        Self::open(cwd.join(ROOT_DIR))
    }

    /// Open a cache rooted at `<inside>/cached`.
    pub fn inside(inside: impl AsRef<Path>) -> Result<Self> {
        Self::open(inside.as_ref().join(ROOT_DIR))
    }

    /// Open a cache at an explicit absolute root directory.
    pub fn at_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(Error::configuration(format!(
                "cache root must be an absolute path: {}",
                root.display()
            )));
        }
        Self::open(root)
    }

    /// Open the cache over a root, reading any existing manifest so a
    /// reconstructed engine immediately sees prior durable state.
    fn open(root: PathBuf) -> Result<Self> {
        let files = FileStore::new(root);
        let manifest = Manifest::new();
        manifest.read(&files)?;
        Ok(Self {
            files,
            manifest,
            memory: Mutex::new(HashMap::new()),
            persist_used: AtomicBool::new(false),
        })
    }

    /// The file store underpinning this cache.
    #[must_use]
    pub fn store(&self) -> &FileStore {
        &self.files
    }

    /// The durable-backed entry index.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Lock the memory table, recovering a poisoned lock (the map is
    /// still valid if another thread panicked mid-insert).
    fn memory(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a call to a cached value or a fresh computation.
    ///
    /// Tiers are consulted in order — memory table, then (when
    /// persisting) the manifest — short-circuiting on the first
    /// non-expired hit. A manifest hit without a materialized value is
    /// lazily loaded from its data file; a missing or undecodable data
    /// file degrades to recomputation. On a miss the computation runs,
    /// and its result is committed to the memory table and, when
    /// persisting, to the manifest and a data file.
    ///
    /// # Errors
    ///
    /// Propagates the computation's own failure unchanged, and any
    /// [`Error::Persist`] raised while writing the result durably.
    /// Cached-read degradations (expired, missing file, corrupt payload)
    /// are never errors, only recomputations.
    pub fn resolve<T, F>(&self, key: &str, options: ResolveOptions<'_, T>, compute: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        let mut options = options;
        if options.persistent() {
            self.persist_used.store(true, Ordering::Relaxed);
        }

        if !options.reload {
            if let Some(value) = self.lookup(key, &options) {
                return Ok(value);
            }
        }

        let value = compute()?;
        tracing::debug!(key, "computed value");

        let mut entry = Entry::new(options.expiration);
        entry.data = Some(Arc::new(value.clone()) as Materialized);

        if let Some(codec) = options.codec {
            let name = match options.namer.take() {
                Some(namer) => format!("{}{}", namer(), options.extension),
                None => self.files.random_name(&options.extension),
            };
            entry.name = Some(name.clone());
            self.memory().insert(key.to_string(), entry.clone());
            self.manifest.set(key, entry);
            tracing::debug!(key, %name, "added entry to manifest");

            let bytes = codec.encode(&value)?;
            self.files.write_data(&name, &bytes)?;
            tracing::debug!(key, %name, "stored result durably");
        } else {
            self.memory().insert(key.to_string(), entry);
        }

        Ok(value)
    }

    /// Consult the cached tiers; `None` means recompute.
    fn lookup<T>(&self, key: &str, options: &ResolveOptions<'_, T>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = { self.memory().get(key).cloned() }.or_else(|| {
            if options.persistent() {
                self.manifest.get(key)
            } else {
                None
            }
        })?;
        tracing::debug!(key, "found entry");

        if entry.expired() {
            tracing::debug!(key, "entry expired");
            return None;
        }

        if let Some(data) = &entry.data {
            return match data.clone().downcast::<T>() {
                Ok(value) => Some((*value).clone()),
                Err(_) => {
                    tracing::warn!(key, "cached value has an unexpected type, recomputing");
                    None
                }
            };
        }

        // Not materialized: lazily load from the entry's data file so
        // repeated calls in this process avoid repeated reads.
        let codec = options.codec?;
        let name = entry.name()?.to_string();
        match self
            .files
            .read_data(&name)
            .and_then(|bytes| codec.decode(&bytes))
        {
            Ok(value) => {
                let mut materialized = entry;
                materialized.data = Some(Arc::new(value.clone()) as Materialized);
                self.manifest.set(key, materialized);
                tracing::debug!(key, %name, "materialized value from data file");
                Some(value)
            }
            Err(e) => {
                tracing::debug!(key, %name, error = %e, "failed to load cached data, recomputing");
                None
            }
        }
    }

    /// Remove one key from both tiers. The data file, if any, stays on
    /// disk; it is unreachable once the manifest forgets its name.
    pub fn evict(&self, key: &str) -> Result<Entry> {
        let from_memory = self.memory().remove(key);
        match (self.manifest.pop(key), from_memory) {
            (Ok(entry), _) => Ok(entry),
            (Err(_), Some(entry)) => Ok(entry),
            (Err(e), None) => Err(e),
        }
    }

    /// Clear the memory table and the manifest. Memory-only: durable
    /// files are not deleted.
    pub fn clear(&self) {
        self.memory().clear();
        self.manifest.clear();
    }

    /// Clear everything, then delete all durable files under the root.
    pub fn purge(&self) -> Result<()> {
        self.clear();
        self.files.purge()
    }

    /// Write the manifest through to durable storage.
    pub fn flush(&self) -> Result<()> {
        self.manifest.write(&self.files)
    }

    /// Re-read the manifest from durable storage, discarding in-memory
    /// manifest state.
    pub fn refresh(&self) -> Result<()> {
        self.manifest.read(&self.files)
    }
}

impl Drop for Cache {
    /// Best-effort write-through when any resolve in this engine's
    /// lifetime persisted, replacing the process-exit hook of designs
    /// past with a deterministic scoped release.
    fn drop(&mut self) {
        if self.persist_used.load(Ordering::Relaxed) {
            if let Err(e) = self.manifest.write(&self.files) {
                tracing::error!(error = %e, "failed to flush manifest on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Text;
    use tempfile::TempDir;

    fn cache() -> (TempDir, Cache) {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::inside(tmp.path()).unwrap();
        (tmp, cache)
    }

    #[test]
    fn relative_root_is_a_configuration_error() {
        assert!(matches!(
            Cache::at_root("relative/cached"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn memory_only_resolve_hits_without_recompute() {
        let (_tmp, cache) = cache();
        let mut calls = 0;

        for _ in 0..3 {
            let value = cache
                .resolve("f()", ResolveOptions::new(), || {
                    calls += 1;
                    Ok::<_, Error>(format!("r{calls}"))
                })
                .unwrap();
            assert_eq!(value, "r1");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn reload_bypasses_cached_tiers() {
        let (_tmp, cache) = cache();
        let mut calls = 0;
        let mut compute = || {
            calls += 1;
            Ok::<_, Error>(calls.to_string())
        };

        assert_eq!(
            cache.resolve("f()", ResolveOptions::new(), &mut compute).unwrap(),
            "1"
        );
        assert_eq!(
            cache
                .resolve("f()", ResolveOptions::new().reload(true), &mut compute)
                .unwrap(),
            "2"
        );
        // The reload overwrote the prior entry
        assert_eq!(
            cache.resolve("f()", ResolveOptions::new(), &mut compute).unwrap(),
            "2"
        );
    }

    #[test]
    fn type_mismatch_degrades_to_recompute() {
        let (_tmp, cache) = cache();

        cache
            .resolve("k", ResolveOptions::new(), || Ok::<_, Error>(7u32))
            .unwrap();
        // Same key, different type: the stale u32 entry is recomputed over
        let value = cache
            .resolve("k", ResolveOptions::new(), || Ok::<_, Error>("text".to_string()))
            .unwrap();
        assert_eq!(value, "text");
    }

    #[test]
    fn compute_errors_propagate_unchanged() {
        let (_tmp, cache) = cache();

        let err = cache
            .resolve("f()", ResolveOptions::<String>::new(), || {
                Err(Error::compute(std::io::Error::other("backend down")))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Compute { .. }));

        // The failure cached nothing
        let value = cache
            .resolve("f()", ResolveOptions::new(), || Ok::<_, Error>("ok".to_string()))
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[test]
    fn evict_drops_a_single_key() {
        let (_tmp, cache) = cache();

        cache
            .resolve("a", ResolveOptions::new().persist(&Text), || {
                Ok("1".to_string())
            })
            .unwrap();
        cache
            .resolve("b", ResolveOptions::new(), || Ok::<_, Error>("2".to_string()))
            .unwrap();

        cache.evict("a").unwrap();
        assert!(cache.manifest().get("a").is_none());
        // Memory-only entries evict too
        cache.evict("b").unwrap();
        assert!(matches!(cache.evict("b"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn clear_leaves_data_files_in_place() {
        let (_tmp, cache) = cache();

        cache
            .resolve(
                "f()",
                ResolveOptions::new().persist(&Text).extension(".txt"),
                || Ok("payload".to_string()),
            )
            .unwrap();
        let data_files = std::fs::read_dir(cache.store().data_dir()).unwrap().count();
        assert_eq!(data_files, 1);

        cache.clear();
        assert!(cache.manifest().is_empty());
        let data_files = std::fs::read_dir(cache.store().data_dir()).unwrap().count();
        assert_eq!(data_files, 1);
    }
}
