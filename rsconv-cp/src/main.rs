//! rsconv-cp - Resolume clip provisioner
//!
//! Drives a local Resolume instance through its HTTP control API: inspects the
//! composition, converts media with ffmpeg, and provisions clips for matched
//! audio/video pairs into empty slots.

use anyhow::{Context, Result};
use clap::Parser;
use rsconv_common::{logging, TomlConfig};
use rsconv_cp::cli::{self, Args};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing before config so its warnings are visible
    let log_handle = logging::init_tracing(logging::BOOTSTRAP_LOG_LEVEL)?;

    let config = TomlConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_base_url_override(args.base_url.as_deref());
    log_handle.apply_level(&config.logging.level)?;

    info!("Starting rsconv-cp {}", env!("CARGO_PKG_VERSION"));
    info!("Control API: {}", config.base_url);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(cancel.clone()));

    cli::run(args.command, &config, &cancel).await
}

/// Cancel all in-flight work on Ctrl+C
async fn cancel_on_interrupt(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling");
            cancel.cancel();
        }
        Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
    }
}
