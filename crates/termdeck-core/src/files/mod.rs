//! Working-directory services for the file tree: listing and recursive
//! change watching.

mod listing;
mod watcher;

pub use listing::{list_dir, DirEntry, EntryKind};
pub use watcher::{DirWatchers, FsChange, FsChangeKind, WatchError};
