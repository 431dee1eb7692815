//! Attach one PTY session to the controlling terminal.
//!
//! Output goes to stdout verbatim, stdin is forwarded to the session, and
//! terminal size changes are polled and propagated. Semantic events from the
//! scanner are logged.

use anyhow::{Context, Result};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast;

use termdeck_core::session::{ChannelTransport, DisplayEvent};
use termdeck_core::{SemanticEvent, SessionManager, SessionManagerBuilder, SessionOptions, Settings};

use crate::cli::split_command;

/// Id of the single session hosted by `run`
const SESSION_ID: &str = "main";

/// Terminal size poll interval
const RESIZE_POLL: Duration = Duration::from_millis(100);

/// Restores cooked mode on drop
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// Build session options from the CLI arguments and the current terminal
pub fn session_options(
    shell: Option<String>,
    cwd: Option<PathBuf>,
    command: &[String],
    size: Option<(u16, u16)>,
) -> SessionOptions {
    let (shell, args) = match split_command(command) {
        Some((program, args)) => (Some(program), args),
        None => (shell, Vec::new()),
    };
    SessionOptions {
        shell,
        cwd: cwd.or_else(|| std::env::current_dir().ok()),
        args,
        cols: size.map(|(cols, _)| cols),
        rows: size.map(|(_, rows)| rows),
        env: Vec::new(),
    }
}

/// Run the session until its process exits; returns the exit code
pub async fn run(
    settings: Settings,
    shell: Option<String>,
    cwd: Option<PathBuf>,
    command: Vec<String>,
) -> Result<i32> {
    let (transport, mut display_rx) = ChannelTransport::new();
    let manager = Arc::new(
        SessionManagerBuilder::new(settings)
            .with_transport(Arc::new(transport))
            .build()
            .context("Failed to build session manager")?,
    );

    let events = tokio::spawn(log_events(manager.subscribe()));

    let options = session_options(shell, cwd, &command, terminal_size());
    manager
        .create(SESSION_ID, options)
        .context("Failed to start session")?;

    let _raw = if std::io::stdin().is_terminal() {
        Some(RawModeGuard::enable()?)
    } else {
        None
    };

    spawn_input_thread(manager.clone());
    let resizer = tokio::spawn(poll_resize(manager.clone()));

    let mut stdout = tokio::io::stdout();
    let mut exit_code = 0;
    while let Some(event) = display_rx.recv().await {
        match event {
            DisplayEvent::Output { data, .. } => {
                if stdout.write_all(&data).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
            DisplayEvent::Exit { exit_code: code, .. } => {
                exit_code = code;
                break;
            }
        }
    }

    resizer.abort();
    events.abort();
    manager.shutdown();
    Ok(exit_code)
}

/// Forward stdin to the session. Blocked reads cannot be cancelled, so the
/// thread is abandoned at exit.
fn spawn_input_thread(manager: Arc<SessionManager>) {
    let spawned = thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut stdin = stdin.lock();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if !manager.is_live(SESSION_ID) {
                            break;
                        }
                        manager.write(SESSION_ID, &buf[..n]);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("stdin read error: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Failed to start stdin thread: {}", e);
    }
}

/// Poll instead of handling SIGWINCH so the same loop works on every platform
async fn poll_resize(manager: Arc<SessionManager>) {
    let mut last = terminal_size();
    let mut ticker = tokio::time::interval(RESIZE_POLL);
    loop {
        ticker.tick().await;
        let current = terminal_size();
        if current != last {
            if let Some((cols, rows)) = current {
                tracing::debug!("Terminal resized to {}x{}", cols, rows);
                manager.resize(SESSION_ID, cols, rows);
            }
            last = current;
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<SemanticEvent>) {
    loop {
        match rx.recv().await {
            Ok(SemanticEvent::SessionActiveChanged { active, .. }) => {
                tracing::info!("Assistant {}", if active { "started" } else { "exited" });
            }
            Ok(SemanticEvent::ModelChanged { model, .. }) => {
                tracing::info!("Model: {}", model);
            }
            Ok(SemanticEvent::CostChanged { cost, .. }) => {
                tracing::info!("Cost: {}", cost);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Dropped {} semantic event(s)", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Current terminal size as (cols, rows)
fn terminal_size() -> Option<(u16, u16)> {
    crossterm::terminal::size()
        .ok()
        .filter(|&(cols, rows)| cols > 0 && rows > 0)
}
