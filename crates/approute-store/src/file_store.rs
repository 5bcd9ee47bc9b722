//! File-content watch-and-cache store
//!
//! `FileStore` maintains a live in-memory mirror of a set of files whose
//! changes are observed through OS-level filesystem notification (the
//! `notify` crate), and exposes that mirror plus a stream of change
//! notifications to independent consumers without blocking either side.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use approute_core::{Error, Result, RotationEvent};

/// Capacity of the rotation and error channels.
///
/// When a channel is full, new events are dropped rather than blocking the
/// dispatch task: a slow consumer degrades notification delivery, never
/// ingestion. Consumers that need guaranteed freshness re-derive state via
/// [`FileStore::get_content`].
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Tracked-file map and watch registration, guarded by one lock.
///
/// All mutation happens inside `add_file` or the dispatch task, under the
/// write guard; content reads take the read guard. The watcher is `None`
/// once the dispatch task has shut down.
struct Inner {
    files: HashMap<PathBuf, Vec<u8>>,
    watcher: Option<RecommendedWatcher>,
    /// How file content is read; tests swap this to drive read failures.
    read_file: fn(&Path) -> std::io::Result<Vec<u8>>,
}

/// A watch-and-cache store over local files.
///
/// Construction spawns exactly one background dispatch task bound to the
/// given [`CancellationToken`]; that task owns the lifetime of the watch
/// subsystem and both output channels. There is no explicit close: cancel
/// the token to shut the store down, at which point both channels close and
/// the OS watch handle is released.
///
/// Callers should register files by absolute path; the path given to
/// [`FileStore::add_file`] is the key under which content and events are
/// reported.
pub struct FileStore {
    inner: Arc<RwLock<Inner>>,
    rotation_rx: Mutex<Option<mpsc::Receiver<RotationEvent>>>,
    error_rx: Mutex<Option<mpsc::Receiver<Error>>>,
}

impl FileStore {
    /// Create a new store and start its dispatch task.
    ///
    /// # Errors
    /// `Error::WatcherInit` if the OS notification mechanism cannot be
    /// initialized. A failed construction leaves nothing running.
    pub fn new(token: CancellationToken) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();

        // The callback runs on notify's own thread and must never block,
        // hence the unbounded handoff into the dispatch task.
        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if raw_tx.send(res).is_err() {
                    // Dispatch task already gone; the watcher is mid-teardown.
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::WatcherInit(e.to_string()))?;

        let inner = Arc::new(RwLock::new(Inner {
            files: HashMap::new(),
            watcher: Some(watcher),
            read_file: |path| std::fs::read(path),
        }));

        let (rotation_tx, rotation_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(dispatch(
            Arc::clone(&inner),
            raw_rx,
            rotation_tx,
            error_tx,
            token,
        ));

        Ok(Self {
            inner,
            rotation_rx: Mutex::new(Some(rotation_rx)),
            error_rx: Mutex::new(Some(error_rx)),
        })
    }

    /// Start tracking a file: read its content into the cache and register
    /// it with the OS watch mechanism.
    ///
    /// No rotation event is emitted for the add itself; only subsequent
    /// external changes produce events.
    ///
    /// # Errors
    /// - `Error::FileNotFound` if the file does not exist
    /// - `Error::NotAFile` if the path is not a regular file
    /// - `Error::AlreadyTracked` if the path is already tracked
    /// - `Error::Stat` / `Error::Read` wrapping the underlying I/O failure
    /// - `Error::Watch` if watch registration fails
    ///
    /// All errors are terminal for the call: no partial state is left
    /// behind. The map entry is committed only after the existence check,
    /// the content read, and the watch registration have all succeeded.
    pub fn add_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(Error::Stat {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        if !metadata.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }

        let mut inner = write_lock(&self.inner);
        if inner.files.contains_key(path) {
            return Err(Error::AlreadyTracked(path.to_path_buf()));
        }

        let content = (inner.read_file)(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let Some(watcher) = inner.watcher.as_mut() else {
            return Err(Error::ShutDown);
        };
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        inner.files.insert(path.to_path_buf(), content);
        info!(path = %path.display(), "tracking file");
        Ok(())
    }

    /// Return a copy of the current content snapshot for `path`, or `None`
    /// if the path is not tracked (including after an observed removal).
    ///
    /// The returned buffer never aliases store-internal state.
    pub fn get_content(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let inner = read_lock(&self.inner);
        inner.files.get(path.as_ref()).cloned()
    }

    /// Number of currently tracked files.
    pub fn tracked_files(&self) -> usize {
        read_lock(&self.inner).files.len()
    }

    /// Take the receive end of the rotation channel.
    ///
    /// One event is delivered per externally observed content change
    /// (`Updated`) or disappearance (`Removed`) of a tracked file, in raw
    /// notification order. The channel is bounded; events are dropped (and
    /// logged) when it is full. The receiver can be taken exactly once;
    /// subsequent calls return `None`. The channel closes when the store's
    /// cancellation token fires.
    pub fn rotation_events(&self) -> Option<mpsc::Receiver<RotationEvent>> {
        self.rotation_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Take the receive end of the error channel.
    ///
    /// Carries non-fatal ingestion failures (refresh read errors, observed
    /// removals). Same bounded, drop-on-full policy and take-once semantics
    /// as [`FileStore::rotation_events`].
    pub fn errors(&self) -> Option<mpsc::Receiver<Error>> {
        self.error_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    #[cfg(test)]
    fn set_read_file(&self, read_file: fn(&Path) -> std::io::Result<Vec<u8>>) {
        write_lock(&self.inner).read_file = read_file;
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("tracked_files", &self.tracked_files())
            .finish()
    }
}

fn write_lock(inner: &RwLock<Inner>) -> RwLockWriteGuard<'_, Inner> {
    inner.write().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock(inner: &RwLock<Inner>) -> RwLockReadGuard<'_, Inner> {
    inner.read().unwrap_or_else(PoisonError::into_inner)
}

/// The single background task that turns raw filesystem notifications into
/// domain-level rotation/error events.
///
/// A single file's failure never stops monitoring of other tracked files.
/// On cancellation the task releases the OS watch handle and returns, which
/// drops both senders and thereby closes the output channels.
async fn dispatch(
    inner: Arc<RwLock<Inner>>,
    mut raw_rx: mpsc::UnboundedReceiver<std::result::Result<Event, notify::Error>>,
    rotation_tx: mpsc::Sender<RotationEvent>,
    error_tx: mpsc::Sender<Error>,
    token: CancellationToken,
) {
    debug!("file store dispatch task started");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            raw = raw_rx.recv() => match raw {
                Some(Ok(event)) => handle_event(&inner, &event, &rotation_tx, &error_tx),
                Some(Err(e)) => {
                    warn!("file watch error: {e}");
                    forward_error(&error_tx, Error::Internal(format!("file watch error: {e}")));
                }
                // The watcher callback sender is gone; nothing more can arrive.
                None => break,
            },
        }
    }

    write_lock(&inner).watcher.take();
    debug!("file store dispatch task stopped");
}

fn handle_event(
    inner: &RwLock<Inner>,
    event: &Event,
    rotation_tx: &mpsc::Sender<RotationEvent>,
    error_tx: &mpsc::Sender<Error>,
) {
    match event.kind {
        // A rename away from a tracked path is modeled as removal; tracking
        // the new name takes a fresh add_file call.
        EventKind::Remove(_)
        | EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Any)) => {
            for path in &event.paths {
                remove_tracked(inner, path, rotation_tx, error_tx);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths[0] is the old name, paths[1] the new one.
            if let [from, to] = event.paths.as_slice() {
                remove_tracked(inner, from, rotation_tx, error_tx);
                refresh_tracked(inner, to, rotation_tx, error_tx);
            }
        }
        EventKind::Create(_)
        | EventKind::Modify(
            ModifyKind::Data(_)
            | ModifyKind::Any
            | ModifyKind::Other
            | ModifyKind::Name(RenameMode::To),
        ) => {
            for path in &event.paths {
                refresh_tracked(inner, path, rotation_tx, error_tx);
            }
        }
        // Metadata-only changes and access events carry no content change.
        _ => {}
    }
}

/// Refresh the cached content for `path` after a write/create notification.
///
/// On read failure the prior snapshot is preserved (stale-but-valid) and the
/// failure is reported on the error channel only. The rotation event is
/// enqueued while the write guard is still held, so `get_content` after a
/// drained event always observes content at least as new as that event.
fn refresh_tracked(
    inner: &RwLock<Inner>,
    path: &Path,
    rotation_tx: &mpsc::Sender<RotationEvent>,
    error_tx: &mpsc::Sender<Error>,
) {
    let mut guard = write_lock(inner);
    if !guard.files.contains_key(path) {
        return;
    }

    match (guard.read_file)(path) {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "refreshed tracked file");
            guard.files.insert(path.to_path_buf(), content);
            forward_event(rotation_tx, RotationEvent::updated(path));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // The file vanished between the notification and the read; the
            // remove notification that follows reports it.
            debug!(path = %path.display(), "tracked file gone at refresh time");
        }
        Err(e) => {
            error!(path = %path.display(), "failed to refresh tracked file: {e}");
            forward_error(
                error_tx,
                Error::Read {
                    path: path.to_path_buf(),
                    source: e,
                },
            );
        }
    }
}

/// Drop `path` from the tracked set after an observed deletion or rename.
///
/// Removal is reported on both channels: an error explaining why the path
/// is gone, and a `Removed` rotation event.
fn remove_tracked(
    inner: &RwLock<Inner>,
    path: &Path,
    rotation_tx: &mpsc::Sender<RotationEvent>,
    error_tx: &mpsc::Sender<Error>,
) {
    let mut guard = write_lock(inner);
    if guard.files.remove(path).is_none() {
        return;
    }
    if let Some(watcher) = guard.watcher.as_mut() {
        // The OS may have dropped the watch with the file already.
        let _ = watcher.unwatch(path);
    }
    warn!(path = %path.display(), "tracked file removed");
    forward_error(error_tx, Error::FileRemoved(path.to_path_buf()));
    forward_event(rotation_tx, RotationEvent::removed(path));
}

fn forward_event(tx: &mpsc::Sender<RotationEvent>, event: RotationEvent) {
    if let Err(mpsc::error::TrySendError::Full(dropped)) = tx.try_send(event) {
        warn!(path = %dropped.path.display(), op = ?dropped.op, "rotation channel full, dropping event");
    }
}

fn forward_error(tx: &mpsc::Sender<Error>, err: Error) {
    if let Err(mpsc::error::TrySendError::Full(dropped)) = tx.try_send(err) {
        warn!("error channel full, dropping error: {dropped}");
    }
}
