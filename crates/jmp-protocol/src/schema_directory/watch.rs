//! Polling watches over individual schema files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
#[cfg(test)]
use std::sync::Weak;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const WATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schema_directory::watch");
const WATCH_THREAD_NAME: &str = "jmp-schema-watch";

/// SHA-256 digest of file contents.
pub(crate) fn digest(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

/// Handle to a background thread polling one file.
///
/// The watch fires its callback at most once, when the file disappears or
/// its digest no longer matches the one it was armed with. Dropping the
/// handle stops the thread.
pub(crate) struct FileWatch {
    release: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    #[cfg(test)]
    liveness: Weak<()>,
}

impl FileWatch {
    pub(crate) fn spawn<C>(
        path: PathBuf,
        armed_digest: Vec<u8>,
        interval: Duration,
        on_change: C,
    ) -> io::Result<Self>
    where
        C: FnOnce() + Send + 'static,
    {
        let (release, released) = mpsc::channel::<()>();
        // Held by the polling thread; dropped exactly when it exits.
        let alive = Arc::new(());
        #[cfg(test)]
        let liveness = Arc::downgrade(&alive);
        let thread = thread::Builder::new()
            .name(WATCH_THREAD_NAME.to_owned())
            .spawn(move || {
                let _alive = alive;
                loop {
                    match released.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if has_changed(&path, &armed_digest) {
                                debug!(
                                    target: WATCH_TARGET,
                                    path = %path.display(),
                                    "schema file changed"
                                );
                                on_change();
                                return;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })?;
        Ok(Self {
            release: Some(release),
            thread: Some(thread),
            #[cfg(test)]
            liveness,
        })
    }

    /// Upgradable only while the polling thread has not exited.
    #[cfg(test)]
    pub(crate) fn liveness(&self) -> Weak<()> {
        self.liveness.clone()
    }

    /// Returns `true` while the polling thread is still running.
    pub(crate) fn is_active(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for FileWatch {
    fn drop(&mut self) {
        drop(self.release.take());
        let Some(thread) = self.thread.take() else {
            return;
        };
        // The last owner can be released from inside the watch's own callback.
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            warn!(target: WATCH_TARGET, "schema watch thread panicked");
        }
    }
}

fn has_changed(path: &Path, armed_digest: &[u8]) -> bool {
    fs::read(path).map_or(true, |bytes| digest(&bytes) != armed_digest)
}

/// At most one live watch per resolved path.
#[derive(Default)]
pub(crate) struct WatchRegistry {
    watches: Mutex<HashMap<PathBuf, FileWatch>>,
}

impl WatchRegistry {
    /// Installs `watch` for `path`, releasing the handle it supersedes.
    pub(crate) fn install(&self, path: PathBuf, watch: FileWatch) {
        let previous = self.lock().insert(path, watch);
        drop(previous);
    }

    /// Number of watches whose polling thread is still running.
    pub(crate) fn active(&self) -> usize {
        self.lock().values().filter(|watch| watch.is_active()).count()
    }

    /// Liveness handles of every installed watch, live or finished.
    #[cfg(test)]
    pub(crate) fn liveness(&self) -> Vec<Weak<()>> {
        self.lock().values().map(FileWatch::liveness).collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, FileWatch>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
