//! SFTP proxy - main entry point
//!
//! Runs the enabled download/upload jobs on their schedules until SIGINT or
//! SIGTERM.

use anyhow::Result;
use clap::Parser;
use sftp_proxy::daemon::shutdown::ShutdownCoordinator;
use sftp_proxy::transport::SftpTransport;
use sftp_proxy::{utils, Config, TransferService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the service configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Run each enabled job once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level, config.log.file.as_deref())?;

    tracing::info!(
        "Starting {} v{} ({})",
        config.service.display_name,
        env!("CARGO_PKG_VERSION"),
        config.service.name
    );
    if !config.service.description.is_empty() {
        tracing::info!("{}", config.service.description);
    }

    if !config.any_job_enabled() {
        tracing::warn!("Neither download nor upload job enabled in the configuration");
    }

    let mut service = TransferService::new(&config, Arc::new(SftpTransport::new()));

    if args.once {
        if let Some(outcome) = service.run_download_job().await {
            tracing::info!(?outcome, "Download job finished");
        }
        if let Some(outcome) = service.run_upload_job().await {
            tracing::info!(?outcome, "Upload job finished");
        }
        return Ok(());
    }

    let shutdown = ShutdownCoordinator::new();

    if let Err(e) = service.start().await {
        tracing::error!(fatal = true, error = %e, "Can not start service");
        return Err(e.into());
    }

    shutdown.wait_for_signal().await;

    service.stop().await?;
    tracing::info!("Service stopped");

    Ok(())
}
