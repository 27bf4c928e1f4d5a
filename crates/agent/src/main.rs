// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Agent service binary.

use clap::Parser;
use observix_agent::Agent;
use observix_agent::config::AgentConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "observix-agent", about = "Observix edge agent")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, short, default_value = "agent.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match AgentConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let agent = match Agent::new(config) {
        Ok(agent) => agent,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let cancel = agent.cancel_token();
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel.cancel();
        }
    }));

    match agent.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "agent terminated");
            ExitCode::from(2)
        }
    }
}
