// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! `observix` - the command-line client for the control plane.
//!
//! Exit codes: 0 on 2xx, 1 on transport or input failure, 2 on a non-2xx
//! response (with the response body printed to stderr).

mod args;
mod client;

use crate::args::Args;
use crate::client::{Client, CliError};
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;

#[allow(clippy::print_stdout)]
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

#[allow(clippy::print_stderr)]
fn print_error(message: &str) {
    eprintln!("{message}");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let client = Client::new(&args.control_plane_url);
    match client.execute(args.command).await {
        Ok(Some(value)) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e @ (CliError::Input(_) | CliError::Transport(_))) => {
            print_error(&e.to_string());
            ExitCode::from(1)
        }
        Err(CliError::Api { body, .. }) => {
            print_error(&body);
            ExitCode::from(2)
        }
    }
}
