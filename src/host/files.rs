use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

use termdeck_core::files::{list_dir, FsChange};
use termdeck_core::{SessionManagerBuilder, Settings};

use super::git::resolve_cwd;

/// Watch id used by `termdeck watch`
const WATCH_ID: &str = "cli";

/// `termdeck ls [dir]`: filtered, sorted listing as JSON
pub async fn print_listing(dir: Option<PathBuf>) -> Result<()> {
    let dir = resolve_cwd(dir)?;
    let entries = list_dir(&dir).await;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

/// `termdeck watch [dir]`: one JSON change per line until ctrl-c
pub async fn watch(settings: Settings, dir: Option<PathBuf>) -> Result<()> {
    let dir = resolve_cwd(dir)?;
    let manager = SessionManagerBuilder::new(settings)
        .build()
        .context("Failed to build session manager")?;

    let mut rx = manager.subscribe_fs();
    manager
        .watch_dir(WATCH_ID, &dir)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    tracing::info!("Watching {} (ctrl-c to stop)", dir.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = rx.recv() => match change {
                Ok(change) => println!("{}", change_line(&change)?),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Dropped {} change(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.shutdown();
    Ok(())
}

fn change_line(change: &FsChange) -> Result<String> {
    Ok(serde_json::to_string(change)?)
}
