//! Core library for termdeck.
//!
//! Multiplexes PTY sessions running an AI assistant CLI, streams their output
//! to a display transport, and scans the same stream on a side channel to
//! derive session-level events (assistant active, model, running cost).
//! Also provides the allowlisted git gateway used by the status sidebar and
//! the directory listing and watch services behind the file tree.

pub mod config;
pub mod files;
pub mod git;
pub mod pty;
pub mod scanner;
pub mod session;

pub use config::Settings;
pub use scanner::{SemanticEvent, SessionScanner};
pub use session::{SessionManager, SessionManagerBuilder, SessionOptions};
