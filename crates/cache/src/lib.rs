//! Persistent function memoization with a two-tier cache
//!
//! This crate memoizes the results of expensive, deterministic
//! computations across process lifetimes. A caller wraps a function;
//! subsequent calls with equivalent arguments return the previously
//! computed result instead of re-executing it, optionally with per-entry
//! time-based expiration and durable storage on a filesystem.
//!
//! # Architecture
//!
//! Two storage tiers back every cache:
//!
//! - the **memory tier**: a process-local table mapping cache keys to
//!   entries with materialized values;
//! - the **durable tier**: a manifest of entry metadata
//!   (`<root>/manifest.json`) plus one data file per persisted entry
//!   (`<root>/data/<name>`).
//!
//! [`Cache::resolve`] consults memory, then the manifest, applies the
//! expiration policy, lazily reloads values from data files, and on a
//! miss runs the computation and commits the result to both tiers. The
//! manifest is mirrored to disk on [`Cache::flush`] (and on drop once
//! anything persisted), so high-frequency cache writes cost a map insert,
//! not a file write.
//!
//! Degraded durable state — a corrupt manifest, a missing or undecodable
//! data file — is never fatal: it logs and falls back to recomputation.
//!
//! # Example
//!
//! ```no_run
//! use memocache::{Cache, Json, Result};
//! use chrono::Duration;
//!
//! fn main() -> Result<()> {
//!     let cache = Cache::inside("/var/tmp/myapp")?;
//!
//!     let lookup = cache
//!         .wrap("myapp::expensive_lookup", |id: &u64| {
//!             Ok(vec![format!("row for {id}")])
//!         })
//!         .persist_with(&Json)
//!         .extension(".json")
//!         .expire_after(Duration::hours(1));
//!
//!     let rows = lookup.call(42)?;      // computes and stores
//!     let cached = lookup.call(42)?;    // served from cache
//!     assert_eq!(rows, cached);
//!
//!     cache.flush()?;
//!     Ok(())
//! }
//! ```
//!
//! # Eviction
//!
//! Eviction is time-based (per-entry expiration) and explicit
//! ([`Cache::evict`], [`Cache::clear`], [`Cache::purge`]) only — there is
//! no capacity-based eviction, no cross-process coordination, and no
//! networked tier.

#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

mod codec;
mod engine;
mod entry;
mod error;
mod manifest;
mod memoize;
mod store;

pub use codec::{Codec, Json, Raw, Text};
pub use engine::{Cache, ResolveOptions};
pub use entry::{DurableEntry, Entry};
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use memoize::Memoized;
pub use store::{DATA_DIR, FileStore, MANIFEST_FILE, ROOT_DIR};
