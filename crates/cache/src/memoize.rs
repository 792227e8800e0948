//! Higher-order call wrapping
//!
//! A [`Memoized`] binds a function to a [`Cache`]: it derives a cache key
//! from the function's identity and its call arguments, then delegates to
//! [`Cache::resolve`]. This is the explicit-closure rendering of what a
//! decorator would do in a dynamic language — no interception magic, no
//! global cache instance.
//!
//! ```no_run
//! use memocache::{Cache, Result};
//!
//! fn main() -> Result<()> {
//!     let cache = Cache::new()?;
//!     let doubled = cache.wrap("demo::slow_double", |n: &u64| Ok(n * 2));
//!
//!     let first = doubled.call(21)?;  // computes
//!     let again = doubled.call(21)?;  // cached
//!     assert_eq!(first, again);
//!     Ok(())
//! }
//! ```

use crate::Result;
use crate::codec::Codec;
use crate::engine::{Cache, ResolveOptions};
use chrono::Duration;
use std::fmt;

/// Serializes call arguments into the key-forming string.
type ArgSerializer<'c, A> = Box<dyn Fn(&A) -> String + 'c>;

/// A function bound to a cache, with per-wrapping resolution options.
///
/// Built with [`Cache::wrap`] or [`Cache::wrap_keyed`] and configured
/// through its builder methods; invoked with [`call`](Memoized::call) or
/// [`reload`](Memoized::reload).
pub struct Memoized<'c, A, T, F>
where
    F: Fn(&A) -> Result<T>,
{
    cache: &'c Cache,
    id: String,
    func: F,
    serializer: ArgSerializer<'c, A>,
    namer: Option<ArgSerializer<'c, A>>,
    extension: String,
    expiration: Option<Duration>,
    codec: Option<&'c dyn Codec<T>>,
}

impl Cache {
    /// Wrap a function under a fully qualified identity.
    ///
    /// Call arguments are serialized into the cache key via their `Debug`
    /// representation; two calls are equivalent exactly when their
    /// arguments render identically. Use [`Cache::wrap_keyed`] to supply
    /// a serializer for argument types without a stable `Debug`.
    pub fn wrap<'c, A, T, F>(&'c self, id: impl Into<String>, func: F) -> Memoized<'c, A, T, F>
    where
        A: fmt::Debug,
        F: Fn(&A) -> Result<T>,
    {
        self.wrap_keyed(id, |args: &A| format!("{args:?}"), func)
    }

    /// Wrap a function with an explicit argument serializer.
    pub fn wrap_keyed<'c, A, T, F>(
        &'c self,
        id: impl Into<String>,
        serializer: impl Fn(&A) -> String + 'c,
        func: F,
    ) -> Memoized<'c, A, T, F>
    where
        F: Fn(&A) -> Result<T>,
    {
        Memoized {
            cache: self,
            id: id.into(),
            func,
            serializer: Box::new(serializer),
            namer: None,
            extension: String::new(),
            expiration: None,
            codec: None,
        }
    }
}

impl<'c, A, T, F> Memoized<'c, A, T, F>
where
    F: Fn(&A) -> Result<T>,
{
    /// Persist results durably, encoding data files with `codec`.
    #[must_use]
    pub fn persist_with(mut self, codec: &'c dyn Codec<T>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Expire cached results `expiration` after computation.
    #[must_use]
    pub fn expire_after(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Extension appended to data-file names.
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Derive data-file names from the call arguments instead of
    /// randomly. Runs only when a persisting miss writes a file.
    #[must_use]
    pub fn named_by(mut self, namer: impl Fn(&A) -> String + 'c) -> Self {
        self.namer = Some(Box::new(namer));
        self
    }

    /// The cache key a given argument set resolves under.
    #[must_use]
    pub fn key(&self, args: &A) -> String {
        format!("{}({})", self.id, (self.serializer)(args))
    }

    /// Invoke through the cache: cached value on a hit, the wrapped
    /// function on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the wrapped function's failure unchanged, and any
    /// persist-write failure.
    pub fn call(&self, args: A) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.invoke(args, false)
    }

    /// Bypass all cached tiers, recompute, and overwrite the prior entry.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`call`](Memoized::call).
    pub fn reload(&self, args: A) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.invoke(args, true)
    }

    fn invoke(&self, args: A, reload: bool) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = self.key(&args);

        let mut options = ResolveOptions::new()
            .reload(reload)
            .extension(self.extension.clone());
        if let Some(expiration) = self.expiration {
            options = options.expire_after(expiration);
        }
        if let Some(codec) = self.codec {
            options = options.persist(codec);
        }
        if let Some(namer) = &self.namer {
            options = options.named(|| namer(&args));
        }

        self.cache.resolve(&key, options, || (self.func)(&args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Text;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn default_keys_use_debug_representation() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::inside(tmp.path()).unwrap();

        let wrapped = cache.wrap("tests::data", |args: &(u32, &str)| {
            Ok(format!("{}-{}", args.0, args.1))
        });
        assert_eq!(wrapped.key(&(1, "a")), r#"tests::data((1, "a"))"#);
    }

    #[test]
    fn custom_serializers_shape_the_key() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::inside(tmp.path()).unwrap();

        let wrapped = cache.wrap_keyed(
            "tests::data",
            |args: &String| format!("len={}", args.len()),
            |args| Ok(args.clone()),
        );
        assert_eq!(wrapped.key(&"Hello, world!".to_string()), "tests::data(len=13)");

        let result = wrapped.call("Hello, world!".to_string()).unwrap();
        assert_eq!(result, "Hello, world!");

        // The derived key is live in the engine's memory tier
        let hit: String = cache
            .resolve("tests::data(len=13)", ResolveOptions::new(), || {
                Err(crate::Error::not_found("should have hit"))
            })
            .unwrap();
        assert_eq!(hit, "Hello, world!");
    }

    #[test]
    fn call_memoizes_and_reload_recomputes() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::inside(tmp.path()).unwrap();
        let calls = Cell::new(0u32);

        let counter = cache.wrap("tests::counter", |_: &()| {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        });

        assert_eq!(counter.call(()).unwrap(), 1);
        assert_eq!(counter.call(()).unwrap(), 1);
        assert_eq!(counter.reload(()).unwrap(), 2);
        assert_eq!(counter.call(()).unwrap(), 2);
    }

    #[test]
    fn named_by_lands_the_expected_data_file() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::inside(tmp.path()).unwrap();

        let wrapped = cache
            .wrap("tests::data", |args: &String| Ok(args.clone()))
            .persist_with(&Text)
            .named_by(|args: &String| args.clone())
            .extension(".txt");

        wrapped.call("hello".to_string()).unwrap();
        assert!(cache.store().data_dir().join("hello.txt").exists());
    }
}
