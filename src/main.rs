use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use termdeck::cli::{Command, Config};
use termdeck::host;
use termdeck_core::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    cli.merge_into(&mut settings);
    settings.validate();

    match cli.command {
        Command::Run {
            shell,
            cwd,
            command,
        } => {
            let code = host::run::run(settings, shell, cwd, command).await?;
            std::process::exit(code);
        }
        Command::Git { cwd, args } => host::git::run_git(&settings, cwd, &args).await,
        Command::Status { cwd } => host::git::print_status(&settings, cwd).await,
        Command::Scan { file, chunk_size } => host::scan::scan_file(&settings, &file, chunk_size).await,
        Command::Ls { dir } => host::files::print_listing(dir).await,
        Command::Watch { dir } => host::files::watch(settings, dir).await,
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("termdeck=debug,termdeck_core=debug")
    } else {
        EnvFilter::new("termdeck=info,termdeck_core=info")
    };

    // stderr keeps PTY output on stdout untouched
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
