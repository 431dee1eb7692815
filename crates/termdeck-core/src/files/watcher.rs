use std::collections::HashMap;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Error type for starting a directory watch
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {}: {source}", .dir.display())]
    Notify {
        dir: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Coarse kind of a filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FsChangeKind {
    Created,
    Modified,
    Renamed,
    Removed,
    Other,
}

impl FsChangeKind {
    /// `None` for access events, which never change the tree
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Any | EventKind::Other => Some(Self::Other),
        }
    }
}

/// Change under a watched directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsChange {
    /// Watch id the change was observed under
    pub id: String,
    /// Watched root
    pub dir: PathBuf,
    pub kind: FsChangeKind,
    /// Affected paths
    pub paths: Vec<PathBuf>,
}

/// Recursive directory watchers keyed by caller-chosen id.
///
/// One watcher per id; watching again under the same id replaces the old
/// watcher. Errors reported by a running watcher are ignored.
pub struct DirWatchers {
    watchers: Mutex<HashMap<String, RecommendedWatcher>>,
    tx: broadcast::Sender<FsChange>,
}

impl DirWatchers {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            watchers: Mutex::new(HashMap::new()),
            tx,
        }
    }

    /// Subscribe to changes from every watcher
    pub fn subscribe(&self) -> broadcast::Receiver<FsChange> {
        self.tx.subscribe()
    }

    /// Watch `dir` recursively under `id`, closing any previous watcher for `id`
    pub fn watch(&self, id: &str, dir: &Path) -> Result<(), WatchError> {
        let mut watchers = self.watchers.lock();
        if watchers.remove(id).is_some() {
            tracing::debug!("Replacing watcher {}", id);
        }

        let tx = self.tx.clone();
        let watch_id = id.to_string();
        let root = dir.to_path_buf();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = FsChangeKind::from_event(&event.kind) else {
                    return;
                };
                // No subscribers is fine
                let _ = tx.send(FsChange {
                    id: watch_id.clone(),
                    dir: root.clone(),
                    kind,
                    paths: event.paths,
                });
            }
            Err(e) => tracing::debug!("Watcher {} error ignored: {}", watch_id, e),
        };

        let notify_err = |source: notify::Error| WatchError::Notify {
            dir: dir.to_path_buf(),
            source,
        };
        let mut watcher = notify::recommended_watcher(handler).map_err(notify_err)?;
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(notify_err)?;

        tracing::debug!("Watching {} as {}", dir.display(), id);
        watchers.insert(id.to_string(), watcher);
        Ok(())
    }

    /// Close the watcher for `id`; no-op if absent
    pub fn unwatch(&self, id: &str) {
        self.watchers.lock().remove(id);
    }

    /// Close every watcher. Safe to call repeatedly.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.watchers.lock().drain().collect();
        drop(drained);
    }

    pub fn is_watching(&self, id: &str) -> bool {
        self.watchers.lock().contains_key(id)
    }

    /// Number of open watchers
    pub fn len(&self) -> usize {
        self.watchers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.lock().is_empty()
    }
}
