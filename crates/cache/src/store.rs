//! Filesystem layout for a cache root
//!
//! A [`FileStore`] owns one cache root directory:
//!
//! ```text
//! <root>/
//!   manifest.json   (durable entry metadata)
//!   data/
//!     <name>        (one file per persisted entry)
//! ```
//!
//! Directories are created lazily and idempotently on first access. A
//! missing manifest file is an empty manifest, not an error.

use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory created inside an `inside` path to hold the cache.
pub const ROOT_DIR: &str = "cached";
/// Subdirectory of the root holding one data file per persisted entry.
pub const DATA_DIR: &str = "data";
/// Metadata file name inside the root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Serialized form of an empty manifest.
const EMPTY_MANIFEST: &str = "{}";

/// File access for a cache root
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    data: PathBuf,
    manifest: PathBuf,
}

impl FileStore {
    /// Create a file store over the given root directory.
    ///
    /// Nothing is touched on disk until the first read or write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data = root.join(DATA_DIR);
        let manifest = root.join(MANIFEST_FILE);
        Self {
            root,
            data,
            manifest,
        }
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The data subdirectory holding persisted entry files.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data
    }

    /// The path of the durable metadata file.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    /// Read the full contents of the manifest file.
    ///
    /// A missing file creates the root tree and an empty manifest, then
    /// returns it. Fails only on permission or device errors.
    pub fn read_manifest(&self) -> Result<String> {
        match fs::read_to_string(&self.manifest) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.manifest.display(), "no manifest file found");
                fs::create_dir_all(&self.root)
                    .map_err(|e| Error::io(e, &self.root, "create_dir_all"))?;
                fs::write(&self.manifest, EMPTY_MANIFEST)
                    .map_err(|e| Error::io(e, &self.manifest, "create"))?;
                tracing::debug!("manifest created");
                Ok(EMPTY_MANIFEST.to_string())
            }
            Err(e) => Err(Error::io(e, &self.manifest, "read")),
        }
    }

    /// Overwrite the manifest file with the given document.
    pub fn write_manifest(&self, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Error::persist(e, &self.root, "create_dir_all"))?;
        fs::write(&self.manifest, contents)
            .map_err(|e| Error::persist(e, &self.manifest, "write"))?;
        Ok(())
    }

    /// Read a persisted data file by its relative name.
    ///
    /// A missing file is a cache-data-miss ([`Error::MissingData`]), not a
    /// crash; the caller falls through to recomputation.
    pub fn read_data(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.data.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::missing_data(name)),
            Err(e) => Err(Error::io(e, &path, "read")),
        }
    }

    /// Write a data file under the data subdirectory, creating it lazily.
    pub fn write_data(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.data.join(name);
        fs::create_dir_all(&self.data)
            .map_err(|e| Error::persist(e, &self.data, "create_dir_all"))?;
        fs::write(&path, bytes).map_err(|e| Error::persist(e, &path, "write"))?;
        Ok(())
    }

    /// Produce a unique file name inside the data directory.
    #[must_use]
    pub fn random_name(&self, extension: &str) -> String {
        format!("{}{extension}", Uuid::new_v4().simple())
    }

    /// Recursively delete the entire cache root.
    ///
    /// A root that never materialized on disk is already purged.
    pub fn purge(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e, &self.root, "remove_dir_all")),
        }
    }
}
