use serde::Serialize;

/// Coarse change classification shown in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Untracked,
    Added,
    Deleted,
    Renamed,
}

/// One entry of `git status --porcelain=v1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitFileStatus {
    /// Path as printed by git (`old -> new` for renames)
    pub path: String,
    /// Whether the index column records a change
    pub staged: bool,
    pub status: FileStatus,
    /// Index column
    pub x: char,
    /// Work-tree column
    pub y: char,
}

/// Parse one `XY <path>` line; lines shorter than four characters are skipped
pub fn parse_status_line(line: &str) -> Option<GitFileStatus> {
    let mut chars = line.chars();
    let x = chars.next()?;
    let y = chars.next()?;
    chars.next()?;
    let path = chars.as_str();
    if path.is_empty() {
        return None;
    }

    let status = if x == '?' && y == '?' {
        FileStatus::Untracked
    } else if x == 'A' || y == 'A' {
        FileStatus::Added
    } else if x == 'D' || y == 'D' {
        FileStatus::Deleted
    } else if x == 'R' || y == 'R' {
        FileStatus::Renamed
    } else {
        FileStatus::Modified
    };

    Some(GitFileStatus {
        path: path.to_string(),
        staged: x != ' ' && x != '?',
        status,
        x,
        y,
    })
}

/// Parse full porcelain output, ignoring blank and malformed lines
pub fn parse_status(output: &str) -> Vec<GitFileStatus> {
    output
        .split('\n')
        .filter(|line| !line.is_empty())
        .filter_map(parse_status_line)
        .collect()
}
