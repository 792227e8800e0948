//! Error types for the memocache crate

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid cache-root arguments at construction
    #[error("cache configuration error: {message}")]
    #[diagnostic(code(memocache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O failure on the read side (permissions, devices)
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(memocache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "create")
        operation: String,
    },

    /// Failure while writing a result to a data file or the metadata file.
    ///
    /// Distinct from [`Error::Io`]: a resolve that was asked to persist and
    /// could not must surface the failure, not report a hit.
    #[error("persist {operation} failed: {}", path.display())]
    #[diagnostic(
        code(memocache::persist),
        help("The computed value could not be stored durably")
    )]
    Persist {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that was being written
        path: Box<Path>,
        /// Operation that failed (e.g., "write", "create_dir_all")
        operation: String,
    },

    /// A durable record failed to parse into a valid entry or value
    #[error("format error: {message}")]
    #[diagnostic(code(memocache::format))]
    Format {
        /// Error message describing the malformed input
        message: String,
    },

    /// A data file referenced by a valid manifest entry is absent
    #[error("cached data file missing: {name}")]
    #[diagnostic(
        code(memocache::missing_data),
        help("The entry will be recomputed on the next resolve")
    )]
    MissingData {
        /// Relative name of the missing data file
        name: String,
    },

    /// Failure raised by the wrapped computation itself
    #[error("wrapped computation failed")]
    #[diagnostic(code(memocache::compute))]
    Compute {
        /// The computation's own error, propagated unchanged
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cache key not found
    #[error("cache key not found: {key}")]
    #[diagnostic(code(memocache::not_found))]
    NotFound {
        /// The cache key that was not found
        key: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a persist-write error with path context
    #[must_use]
    pub fn persist(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Persist {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }

    /// Create a format error
    #[must_use]
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
        }
    }

    /// Create a missing-data error
    #[must_use]
    pub fn missing_data(name: impl Into<String>) -> Self {
        Self::MissingData { name: name.into() }
    }

    /// Wrap a failure raised by the wrapped computation
    #[must_use]
    pub fn compute(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Compute {
            source: Box::new(source),
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
