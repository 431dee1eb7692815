//! Allowlisted git gateway.
//!
//! Lets the UI run a small set of read-mostly git subcommands in a
//! session's working directory. Anything outside the allow-set is refused
//! before a process is spawned, and every run is bounded in time and
//! output size.

mod gateway;
mod policy;
mod runner;
mod status;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use gateway::{authorize, GitGateway, ALLOWED_SUBCOMMANDS};
pub use policy::PathPolicy;
pub use runner::{CommandOutput, CommandRunner, RunLimits, TokioRunner};
pub use status::{parse_status, parse_status_line, FileStatus, GitFileStatus};

/// Error type for gateway operations
#[derive(Debug, Error)]
pub enum GitError {
    /// Subcommand outside the allow-set (empty when no arguments were given)
    #[error("git subcommand not allowed: {0}")]
    NotAllowed(String),

    /// Write operation targets a path outside the allowed roots
    #[error("access denied: {} is outside allowed roots", .0.display())]
    AccessDenied(PathBuf),

    /// Carries whatever stderr the command wrote before it was killed
    #[error("git timed out after {after:?}{}", with_detail(.stderr))]
    Timeout { after: Duration, stderr: String },

    #[error("git output exceeded {0} bytes")]
    OutputTooLarge(usize),

    /// Non-zero exit; carries stderr when there was any
    #[error("{0}")]
    Failed(String),

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

fn with_detail(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
