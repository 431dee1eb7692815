//! Default shell resolution.
//!
//! On Windows the resolver probes the known Git-for-Windows bash locations
//! before falling back to PowerShell. Elsewhere it honours `$SHELL`.

use std::path::Path;

/// Git-for-Windows bash locations, probed in order
pub const GIT_BASH_CANDIDATES: [&str; 2] = [
    r"C:\Program Files\Git\bin\bash.exe",
    r"C:\Program Files (x86)\Git\bin\bash.exe",
];

/// Windows shell when no Git bash is installed
pub const WINDOWS_FALLBACK_SHELL: &str = "powershell.exe";

/// Unix shell when `$SHELL` is unset
pub const UNIX_FALLBACK_SHELL: &str = "/bin/bash";

/// Platform family for shell selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// Filesystem existence check, injectable for tests
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Strategy for choosing a shell when the caller did not name one
pub trait ShellResolver: Send + Sync {
    fn default_shell(&self) -> String;
}

/// Pick the default shell for `platform`
pub fn default_shell(platform: Platform, probe: &dyn PathProbe, shell_env: Option<&str>) -> String {
    match platform {
        Platform::Windows => GIT_BASH_CANDIDATES
            .iter()
            .find(|candidate| probe.exists(Path::new(candidate)))
            .map(|candidate| candidate.to_string())
            .unwrap_or_else(|| WINDOWS_FALLBACK_SHELL.to_string()),
        Platform::Unix => shell_env
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNIX_FALLBACK_SHELL)
            .to_string(),
    }
}

/// Resolver for the running platform
pub struct PlatformShellResolver<P = FsProbe> {
    platform: Platform,
    probe: P,
}

impl Default for PlatformShellResolver {
    fn default() -> Self {
        Self::new(Platform::current(), FsProbe)
    }
}

impl<P: PathProbe> PlatformShellResolver<P> {
    pub fn new(platform: Platform, probe: P) -> Self {
        Self { platform, probe }
    }
}

impl<P: PathProbe> ShellResolver for PlatformShellResolver<P> {
    fn default_shell(&self) -> String {
        let shell_env = std::env::var("SHELL").ok();
        default_shell(self.platform, &self.probe, shell_env.as_deref())
    }
}
