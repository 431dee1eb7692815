use std::path::{Component, Path, PathBuf};

/// Set of directory roots that file-mutating git operations may touch.
///
/// Checks are lexical: `..` segments are folded before comparing, symlinks
/// are not resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathPolicy {
    roots: Vec<PathBuf>,
}

impl PathPolicy {
    pub fn new<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(|r| normalize(&r)).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve `path` against `cwd` the way a shell would
    pub fn resolve(cwd: &Path, path: &str) -> PathBuf {
        let joined = cwd.join(path);
        let absolute = if joined.is_absolute() {
            joined
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(&joined))
                .unwrap_or(joined)
        };
        normalize(&absolute)
    }

    /// Whether `path` lies inside one of the roots
    pub fn is_allowed(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.roots.iter().any(|root| path.starts_with(root))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
