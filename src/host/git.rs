use anyhow::{Context, Result};
use std::path::PathBuf;

use termdeck_core::git::GitGateway;
use termdeck_core::Settings;

pub(crate) fn resolve_cwd(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(cwd) => Ok(cwd),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// `termdeck git <args>`: run through the gateway and print stdout
pub async fn run_git(settings: &Settings, cwd: Option<PathBuf>, args: &[String]) -> Result<()> {
    let cwd = resolve_cwd(cwd)?;
    let gateway = GitGateway::new(&settings.git);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = gateway.run(&args, &cwd).await?;
    print!("{output}");
    Ok(())
}

/// `termdeck status`: parsed porcelain status as JSON
pub async fn print_status(settings: &Settings, cwd: Option<PathBuf>) -> Result<()> {
    let cwd = resolve_cwd(cwd)?;
    let gateway = GitGateway::new(&settings.git);

    if !gateway.is_repo(&cwd).await {
        anyhow::bail!("{} is not inside a git work tree", cwd.display());
    }
    let files = gateway
        .status(&cwd)
        .await
        .with_context(|| format!("git status failed in {}", cwd.display()))?;
    println!("{}", serde_json::to_string_pretty(&files)?);
    Ok(())
}
