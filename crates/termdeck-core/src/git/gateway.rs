use std::path::Path;

use super::policy::PathPolicy;
use super::runner::{CommandOutput, CommandRunner, RunLimits, TokioRunner};
use super::status::{parse_status, GitFileStatus};
use super::GitError;
use crate::config::GitSettings;

/// Git subcommands the gateway will run
pub const ALLOWED_SUBCOMMANDS: [&str; 6] = ["status", "diff", "show", "add", "restore", "rev-parse"];

/// Check the first argument against the allow-set
pub fn authorize(args: &[&str]) -> Result<(), GitError> {
    match args.first() {
        Some(sub) if ALLOWED_SUBCOMMANDS.contains(sub) => Ok(()),
        Some(sub) => Err(GitError::NotAllowed(sub.to_string())),
        None => Err(GitError::NotAllowed(String::new())),
    }
}

/// Allowlisted, bounded git execution for the status sidebar
pub struct GitGateway<R = TokioRunner> {
    runner: R,
    limits: RunLimits,
    policy: PathPolicy,
}

impl GitGateway<TokioRunner> {
    pub fn new(settings: &GitSettings) -> Self {
        Self::with_runner(TokioRunner, settings)
    }
}

impl<R: CommandRunner> GitGateway<R> {
    pub fn with_runner(runner: R, settings: &GitSettings) -> Self {
        Self {
            runner,
            limits: RunLimits::from_settings(settings),
            policy: PathPolicy::new(settings.effective_roots()),
        }
    }

    /// Run `git <args>` in `cwd` and return stdout.
    ///
    /// Subcommands outside [`ALLOWED_SUBCOMMANDS`] are rejected before
    /// anything is spawned.
    pub async fn run(&self, args: &[&str], cwd: &Path) -> Result<String, GitError> {
        authorize(args)?;
        tracing::debug!("git {} (in {})", args.join(" "), cwd.display());

        let output = self.runner.run("git", args, cwd, self.limits).await?;
        if !output.success() {
            return Err(failure(&output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `cwd` is inside a work tree; any failure counts as no
    pub async fn is_repo(&self, cwd: &Path) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"], cwd)
            .await
            .is_ok()
    }

    /// Parsed porcelain status
    pub async fn status(&self, cwd: &Path) -> Result<Vec<GitFileStatus>, GitError> {
        let output = self.run(&["status", "--porcelain=v1"], cwd).await?;
        Ok(parse_status(&output))
    }

    /// Unified diff of one file, against the index or (`staged`) against HEAD
    pub async fn diff(&self, cwd: &Path, path: &str, staged: bool) -> Result<String, GitError> {
        if staged {
            self.run(&["diff", "--cached", "--", path], cwd).await
        } else {
            self.run(&["diff", "--", path], cwd).await
        }
    }

    /// File content at HEAD
    pub async fn show_head(&self, cwd: &Path, path: &str) -> Result<String, GitError> {
        let spec = format!("HEAD:{path}");
        self.run(&["show", &spec], cwd).await
    }

    pub async fn stage(&self, cwd: &Path, path: &str) -> Result<(), GitError> {
        self.check_path(cwd, path)?;
        self.run(&["add", "--", path], cwd).await.map(drop)
    }

    pub async fn unstage(&self, cwd: &Path, path: &str) -> Result<(), GitError> {
        self.check_path(cwd, path)?;
        self.run(&["restore", "--staged", "--", path], cwd)
            .await
            .map(drop)
    }

    fn check_path(&self, cwd: &Path, path: &str) -> Result<(), GitError> {
        let resolved = PathPolicy::resolve(cwd, path);
        if self.policy.is_allowed(&resolved) {
            Ok(())
        } else {
            tracing::warn!("Refusing git write outside allowed roots: {}", resolved.display());
            Err(GitError::AccessDenied(resolved))
        }
    }
}

fn failure(output: &CommandOutput) -> GitError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return GitError::Failed(stderr.to_string());
    }
    match output.code {
        Some(code) => GitError::Failed(format!("git exited with status {code}")),
        None => GitError::Failed("git was terminated by a signal".to_string()),
    }
}
