//! Per-key cache entries and their durable form
//!
//! An [`Entry`] is the unit stored under a cache key: the relative name of
//! its data file (once persisted), its creation time, an optional
//! expiration window, and an optional materialized value. Only the
//! metadata survives to disk — the value lives in the memory tier and in
//! the entry's own data file.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// A materialized value, type-erased so one cache can serve wrapped
/// functions with different return types.
pub(crate) type Materialized = Arc<dyn Any + Send + Sync>;

/// Entry in the cache: metadata plus an optional materialized value.
///
/// `data` being `None` means "not loaded", which is distinct from a cached
/// null — a wrapped function returning `Option<T>` caches `None` as
/// `Some(Arc(None))`.
#[derive(Clone)]
pub struct Entry {
    pub(crate) name: Option<String>,
    pub(crate) created: DateTime<Utc>,
    pub(crate) expiration: Option<Duration>,
    pub(crate) data: Option<Materialized>,
}

/// The on-disk record for an entry: metadata only, value stripped.
///
/// Timestamps are unix seconds with float precision; `expiration` is a
/// span in seconds or null for "never expires".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurableEntry {
    /// Relative name of the persisted data file
    pub name: Option<String>,
    /// Creation time, unix seconds
    pub created: f64,
    /// Expiration span in seconds, null to never expire
    pub expiration: Option<f64>,
}

impl Entry {
    /// Create a fresh entry with `created = now` and no value.
    #[must_use]
    pub fn new(expiration: Option<Duration>) -> Self {
        Self {
            name: None,
            created: Utc::now(),
            expiration,
            data: None,
        }
    }

    /// Relative name of the persisted data file, if one was assigned.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// When the entry's value was computed.
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// The entry's expiration window, if any.
    #[must_use]
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Whether a value is materialized in memory.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the entry's value has outlived its expiration window.
    ///
    /// The boundary is inclusive: an entry exactly `expiration` old is
    /// expired. Entries without a window never expire.
    #[must_use]
    pub fn expired(&self) -> bool {
        match self.expiration {
            Some(expiration) => Utc::now() - self.created >= expiration,
            None => false,
        }
    }

    /// Strip the materialized value down to the durable record.
    #[must_use]
    pub fn to_durable(&self) -> DurableEntry {
        DurableEntry {
            name: self.name.clone(),
            created: self.created.timestamp_micros() as f64 / MICROS_PER_SEC,
            expiration: self.expiration.map(span_to_secs),
        }
    }

    /// Reconstruct an entry from its durable record.
    ///
    /// Fails with [`Error::Format`] on out-of-range or non-finite
    /// timestamps — corrupt metadata must never fabricate a plausible
    /// entry.
    pub fn from_durable(record: DurableEntry) -> Result<Self> {
        let created = secs_to_datetime(record.created)?;
        let expiration = record.expiration.map(secs_to_span).transpose()?;
        Ok(Self {
            name: record.name,
            created,
            expiration,
            data: None,
        })
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("created", &self.created)
            .field("expiration", &self.expiration)
            .field("materialized", &self.data.is_some())
            .finish()
    }
}

fn span_to_secs(span: Duration) -> f64 {
    span.num_microseconds()
        .map_or_else(|| span.num_seconds() as f64, |us| us as f64 / MICROS_PER_SEC)
}

fn secs_to_span(secs: f64) -> Result<Duration> {
    if !secs.is_finite() {
        return Err(Error::format(format!("invalid expiration span: {secs}")));
    }
    Ok(Duration::microseconds((secs * MICROS_PER_SEC) as i64))
}

fn secs_to_datetime(secs: f64) -> Result<DateTime<Utc>> {
    if !secs.is_finite() {
        return Err(Error::format(format!("invalid creation timestamp: {secs}")));
    }
    DateTime::from_timestamp_micros((secs * MICROS_PER_SEC) as i64)
        .ok_or_else(|| Error::format(format!("creation timestamp out of range: {secs}")))
}
