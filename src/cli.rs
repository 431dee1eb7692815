use clap::{Parser, Subcommand};
use std::path::PathBuf;

use termdeck_core::Settings;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "PTY session host for AI assistant terminals")]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Assistant product name the scanner looks for
    #[arg(long, global = true)]
    pub product: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a shell (or the given command) in a PTY session attached to this terminal
    Run {
        /// Shell to start when no command is given
        #[arg(long)]
        shell: Option<String>,

        /// Working directory for the session
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Command and arguments to run instead of the shell
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run an allowlisted git subcommand
    Git {
        /// Repository directory
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Git arguments, starting with the subcommand
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the parsed git status of a directory as JSON
    Status {
        /// Repository directory
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Replay a recorded terminal stream through the scanner and print events
    Scan {
        /// File with raw PTY output
        file: PathBuf,

        /// Bytes fed to the scanner per chunk
        #[arg(long, default_value_t = 4096)]
        chunk_size: usize,
    },
    /// List a directory the way the file tree shows it, as JSON
    Ls {
        /// Directory to list (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Print changes under a directory as JSON lines until interrupted
    Watch {
        /// Directory to watch (default: current directory)
        dir: Option<PathBuf>,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply CLI overrides on top of file settings
    pub fn merge_into(&self, settings: &mut Settings) {
        if let Some(product) = &self.product {
            settings.scanner.product_name = product.clone();
        }
    }
}

/// Split `[program, args...]`; empty means "use the shell"
pub fn split_command(command: &[String]) -> Option<(String, Vec<String>)> {
    let (program, args) = command.split_first()?;
    Some((program.clone(), args.to_vec()))
}
