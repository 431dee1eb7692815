//! termdeck host binary: CLI parsing and the subcommand drivers built on
//! `termdeck-core`.

pub mod cli;
pub mod host;
