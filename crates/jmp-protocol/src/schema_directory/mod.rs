//! Filesystem-backed schema source.
//!
//! Message type `a.b.c` resolves to `<root>/a/b/c.schema`, a draft-04
//! JSON-Schema document. Resolved schemas are memoized in a [`SchemaCache`];
//! every successful read arms a watch on the file, and the watch evicts the
//! cache entry once the file changes or disappears, so the next lookup reads
//! the new contents. Types that never resolved have no watch and are simply
//! read again on every lookup.

mod watch;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use crate::envelope::Identifier;
use crate::error::{ConfigurationError, FetchError};
use crate::schema_cache::{FetchOutcome, SchemaCache, SchemaFetcher};
use crate::validator::Schema;

use self::watch::{FileWatch, WatchRegistry, digest};

const SOURCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schema_directory");

/// File extension of schema documents.
pub const SCHEMA_EXTENSION: &str = "schema";

/// Poll interval used by [`SchemaDirectorySource::open`].
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Resolves a message type to its schema file below `root`.
///
/// Every `.` separates a directory level. Returns `None` for names that would
/// escape the root or contain empty segments.
#[must_use]
pub fn schema_path(root: &Path, message_type: &Identifier) -> Option<PathBuf> {
    let name = message_type.to_string();
    let mut path = root.to_path_buf();
    for segment in name.split('.') {
        if segment.is_empty() || segment.contains(['/', '\\']) {
            return None;
        }
        path.push(segment);
    }
    path.as_mut_os_string().push(".");
    path.as_mut_os_string().push(SCHEMA_EXTENSION);
    Some(path)
}

/// Schema source reading `<type>.schema` files below a root directory.
///
/// Clones share the same cache and watches. Watches are released when the
/// last clone is dropped.
#[derive(Clone)]
pub struct SchemaDirectorySource {
    inner: Arc<DirectoryInner>,
}

struct DirectoryInner {
    cache: SchemaCache<DirectoryLoader>,
}

struct DirectoryLoader {
    root: PathBuf,
    interval: Duration,
    watches: WatchRegistry,
    owner: Weak<DirectoryInner>,
}

impl SchemaDirectorySource {
    /// Opens a source over `root` with the default watch interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfiguration`] if `root` does not
    /// exist or is not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        Self::with_watch_interval(root, DEFAULT_WATCH_INTERVAL)
    }

    /// Opens a source over `root`, polling watched files every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfiguration`] if `root` does not
    /// exist or is not a directory.
    pub fn with_watch_interval(
        root: impl AsRef<Path>,
        interval: Duration,
    ) -> Result<Self, ConfigurationError> {
        let root = root.as_ref();
        let metadata = fs::metadata(root).map_err(|error| {
            ConfigurationError::invalid(format!(
                "schema directory '{}' is not accessible: {error}",
                root.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(ConfigurationError::invalid(format!(
                "schema directory '{}' is not a directory",
                root.display()
            )));
        }

        let root = root.to_path_buf();
        let inner = Arc::new_cyclic(|owner| DirectoryInner {
            cache: SchemaCache::new(DirectoryLoader {
                root,
                interval,
                watches: WatchRegistry::default(),
                owner: owner.clone(),
            }),
        });
        Ok(Self { inner })
    }

    /// Returns the schema for `message_type`, reading it from disk on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownMessageType`] when the file is missing,
    /// unreadable, or not valid JSON.
    pub fn fetch_schema(&self, message_type: &Identifier) -> FetchOutcome {
        self.inner.cache.get(message_type)
    }

    /// Returns `true` when the type's schema is currently memoized.
    #[must_use]
    pub fn is_cached(&self, message_type: &Identifier) -> bool {
        self.inner.cache.is_cached(message_type)
    }

    /// Evicts the type's schema so the next lookup reads the file again.
    pub fn invalidate(&self, message_type: &Identifier) {
        self.inner.cache.remove(message_type);
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.cache.fetcher().root
    }

    /// Number of file watches that are still polling.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.inner.cache.fetcher().watches.active()
    }

    #[cfg(test)]
    fn watch_liveness(&self) -> Vec<Weak<()>> {
        self.inner.cache.fetcher().watches.liveness()
    }
}

impl SchemaFetcher for SchemaDirectorySource {
    fn fetch(&self, message_type: &Identifier) -> FetchOutcome {
        self.fetch_schema(message_type)
    }
}

impl DirectoryLoader {
    fn arm_watch(&self, message_type: &Identifier, path: PathBuf, armed_digest: Vec<u8>) {
        let owner = self.owner.clone();
        let key = message_type.clone();
        let on_change = move || {
            if let Some(inner) = owner.upgrade() {
                inner.cache.remove(&key);
            }
        };
        match FileWatch::spawn(path.clone(), armed_digest, self.interval, on_change) {
            Ok(watch) => {
                debug!(
                    target: SOURCE_TARGET,
                    %message_type,
                    path = %path.display(),
                    "schema watch armed"
                );
                self.watches.install(path, watch);
            }
            Err(error) => warn!(
                target: SOURCE_TARGET,
                %message_type,
                path = %path.display(),
                %error,
                "failed to arm schema watch; changes will not be picked up"
            ),
        }
    }
}

impl SchemaFetcher for DirectoryLoader {
    fn fetch(&self, message_type: &Identifier) -> FetchOutcome {
        let Some(path) = schema_path(&self.root, message_type) else {
            debug!(target: SOURCE_TARGET, %message_type, "type name does not map to a schema path");
            return Err(FetchError::unknown_message_type(message_type));
        };
        let bytes = fs::read(&path).map_err(|error| {
            debug!(
                target: SOURCE_TARGET,
                %message_type,
                path = %path.display(),
                %error,
                "schema file unreadable"
            );
            FetchError::unknown_message_type(message_type)
        })?;
        let document = serde_json::from_slice(&bytes).map_err(|error| {
            debug!(
                target: SOURCE_TARGET,
                %message_type,
                path = %path.display(),
                %error,
                "schema file is not valid JSON"
            );
            FetchError::unknown_message_type(message_type)
        })?;

        self.arm_watch(message_type, path, digest(&bytes));
        Ok(Some(Arc::new(Schema::new(document))))
    }
}

#[cfg(test)]
mod tests;
