use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::GitError;
use crate::config::GitSettings;

/// Bounds applied to every command run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Wall-clock limit; the child is killed when it elapses
    pub timeout: Duration,
    /// Cap on bytes captured from each of stdout and stderr
    pub max_output_bytes: usize,
}

impl RunLimits {
    pub fn from_settings(settings: &GitSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms),
            max_output_bytes: settings.max_output_bytes,
        }
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self::from_settings(&GitSettings::default())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes external commands for the gateway
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd`, enforcing `limits`
    fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        limits: RunLimits,
    ) -> impl Future<Output = Result<CommandOutput, GitError>> + Send;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

impl CommandRunner for TokioRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        limits: RunLimits,
    ) -> Result<CommandOutput, GitError> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let cap = limits.max_output_bytes;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let work = async {
            let (out_overflow, err_overflow) = tokio::try_join!(
                read_capped(stdout_pipe, cap, &mut stdout),
                read_capped(stderr_pipe, cap, &mut stderr)
            )?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out_overflow || err_overflow))
        };

        // `child` is killed on drop when this returns early
        let result = tokio::time::timeout(limits.timeout, work).await;
        let Ok(finished) = result else {
            return Err(GitError::Timeout {
                after: limits.timeout,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        };
        let (status, overflow) = finished?;

        if overflow {
            return Err(GitError::OutputTooLarge(cap));
        }

        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Append up to `cap` bytes to `buf`, draining the rest so the child can
/// finish. Returns whether the stream exceeded `cap`.
///
/// Bytes land in `buf` as they are read, so a cancelled read keeps what
/// arrived before cancellation.
async fn read_capped<R>(reader: Option<R>, cap: usize, buf: &mut Vec<u8>) -> std::io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(false);
    };

    let mut overflow = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(overflow);
        }
        let keep = n.min(cap.saturating_sub(buf.len()));
        buf.extend_from_slice(&chunk[..keep]);
        overflow |= keep < n;
    }
}
