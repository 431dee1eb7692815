use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// PTY session defaults
    #[serde(default)]
    pub session: SessionSettings,

    /// Output scanner settings
    #[serde(default)]
    pub scanner: ScannerSettings,

    /// Git gateway settings
    #[serde(default)]
    pub git: GitSettings,
}

/// Defaults applied when a session is created without explicit options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Shell program to use instead of the platform default
    #[serde(default)]
    pub default_shell: Option<String>,

    /// Initial terminal columns
    #[serde(default = "default_cols")]
    pub cols: u16,

    /// Initial terminal rows
    #[serde(default = "default_rows")]
    pub rows: u16,

    /// Value forced into TERM for every spawned process
    #[serde(default = "default_term")]
    pub term: String,

    /// Environment variables removed before spawning.
    ///
    /// These mark a process as already running inside an assistant session;
    /// a nested assistant that inherits them misdetects its own context.
    #[serde(default = "default_strip_env")]
    pub strip_env: Vec<String>,
}

fn default_cols() -> u16 {
    120
}

fn default_rows() -> u16 {
    30
}

fn default_term() -> String {
    "xterm-256color".to_string()
}

fn default_strip_env() -> Vec<String> {
    vec!["CLAUDECODE".to_string(), "CLAUDE_CODE_ENTRYPOINT".to_string()]
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_shell: None,
            cols: default_cols(),
            rows: default_rows(),
            term: default_term(),
            strip_env: default_strip_env(),
        }
    }
}

/// Heuristic scanner tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Product name matched by the banner, model and exit heuristics
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Rolling buffer cap in characters
    #[serde(default = "default_buffer_cap")]
    pub buffer_cap: usize,

    /// Buffer tail inspected for border glyphs on a prompt-like chunk
    #[serde(default = "default_exit_tail")]
    pub exit_tail_chars: usize,

    /// Innermost tail that must not mention the product name
    #[serde(default = "default_exit_name_tail")]
    pub exit_name_tail_chars: usize,
}

fn default_product_name() -> String {
    "Claude".to_string()
}

fn default_buffer_cap() -> usize {
    2048
}

fn default_exit_tail() -> usize {
    200
}

fn default_exit_name_tail() -> usize {
    80
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            buffer_cap: default_buffer_cap(),
            exit_tail_chars: default_exit_tail(),
            exit_name_tail_chars: default_exit_name_tail(),
        }
    }
}

/// Git gateway limits and path policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitSettings {
    /// Per-invocation timeout in milliseconds
    #[serde(default = "default_git_timeout")]
    pub timeout_ms: u64,

    /// Maximum bytes captured from stdout or stderr
    #[serde(default = "default_git_max_output")]
    pub max_output_bytes: usize,

    /// Roots under which stage/unstage may touch files.
    /// Empty means the user's home directory.
    #[serde(default)]
    pub allowed_roots: Vec<PathBuf>,
}

fn default_git_timeout() -> u64 {
    10_000
}

fn default_git_max_output() -> usize {
    1024 * 1024
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_git_timeout(),
            max_output_bytes: default_git_max_output(),
            allowed_roots: Vec::new(),
        }
    }
}

impl GitSettings {
    /// Allowed roots with the home-directory fallback applied
    pub fn effective_roots(&self) -> Vec<PathBuf> {
        if self.allowed_roots.is_empty() {
            dirs::home_dir().into_iter().collect()
        } else {
            self.allowed_roots.clone()
        }
    }
}

impl Settings {
    /// Load settings from the given path, the default locations, or defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("termdeck/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/termdeck/config.toml")),
            dirs::home_dir().map(|p| p.join(".termdeck.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        Ok(Self::default())
    }

    /// Validate and normalize settings values
    ///
    /// Zero geometry and zero-sized windows would make the PTY or the
    /// scanner degenerate, so they fall back to defaults.
    pub fn validate(&mut self) {
        if self.session.cols == 0 {
            self.session.cols = default_cols();
        }
        if self.session.rows == 0 {
            self.session.rows = default_rows();
        }
        if self.session.term.trim().is_empty() {
            self.session.term = default_term();
        }
        if self.scanner.product_name.trim().is_empty() {
            self.scanner.product_name = default_product_name();
        }
        if self.scanner.buffer_cap == 0 {
            self.scanner.buffer_cap = default_buffer_cap();
        }
        if self.scanner.exit_tail_chars == 0 {
            self.scanner.exit_tail_chars = default_exit_tail();
        }
        if self.scanner.exit_name_tail_chars == 0
            || self.scanner.exit_name_tail_chars > self.scanner.exit_tail_chars
        {
            self.scanner.exit_name_tail_chars =
                default_exit_name_tail().min(self.scanner.exit_tail_chars);
        }
        if self.git.timeout_ms == 0 {
            self.git.timeout_ms = default_git_timeout();
        }
        if self.git.max_output_bytes == 0 {
            self.git.max_output_bytes = default_git_max_output();
        }
    }
}
