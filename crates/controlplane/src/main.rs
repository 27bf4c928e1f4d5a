// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Control-plane service binary.

use clap::Parser;
use observix_controlplane::config::ControlPlaneConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "observix-controlplane", about = "Observix control plane")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, short, default_value = "controlplane.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match ControlPlaneConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    }));

    match observix_controlplane::run(config, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "control plane terminated");
            ExitCode::from(2)
        }
    }
}
