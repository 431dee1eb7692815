use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Directory names never listed
const SKIPPED_DIRS: &[&str] = &["node_modules", "__pycache__", ".git"];

/// Dotfile that stays visible
const VISIBLE_DOTFILE: &str = ".claude";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: PathBuf,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

fn is_hidden(name: &str) -> bool {
    (name.starts_with('.') && name != VISIBLE_DOTFILE) || SKIPPED_DIRS.contains(&name)
}

/// Directories first, then case-insensitive name with the raw name as tiebreak
fn compare(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// List the immediate children of `dir` for the file tree.
///
/// Unreadable directories list as empty.
pub async fn list_dir(dir: &Path) -> Vec<DirEntry> {
    let mut reader = match tokio::fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped listing {}: {}", dir.display(), e);
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }
        let kind = match entry.file_type().await {
            Ok(t) if t.is_dir() => EntryKind::Directory,
            _ => EntryKind::File,
        };
        entries.push(DirEntry {
            name,
            kind,
            path: entry.path(),
        });
    }

    entries.sort_by(compare);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_directories_first_then_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("A.md"), "").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();

        let entries = list_dir(dir.path()).await;
        assert_eq!(names(&entries), vec!["Docs", "src", "A.md", "b.txt"]);
        assert!(entries[0].is_dir());
        assert_eq!(entries[2].path, dir.path().join("A.md"));
    }

    #[tokio::test]
    async fn test_hidden_and_heavy_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for name in [".git", ".claude", "node_modules", "__pycache__", "lib"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join(".env"), "").unwrap();
        fs::write(dir.path().join("main.rs"), "").unwrap();

        let entries = list_dir(dir.path()).await;
        assert_eq!(names(&entries), vec![".claude", "lib", "main.rs"]);
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_dir(&dir.path().join("gone")).await.is_empty());
    }
}
