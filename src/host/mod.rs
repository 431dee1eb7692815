//! Subcommand drivers

pub mod files;
pub mod git;
pub mod run;
pub mod scan;
