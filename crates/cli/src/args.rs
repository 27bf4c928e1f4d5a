// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface of the `observix` client.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Thin HTTP client for the Observix control plane.
#[derive(Debug, Parser)]
#[command(name = "observix", version, about)]
pub struct Args {
    /// Base URL of the control plane.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8200")]
    pub control_plane_url: String,

    /// The resource to operate on.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level resources.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage pipelines.
    #[command(subcommand)]
    Pipeline(PipelineCommand),
    /// Manage assignments.
    #[command(subcommand)]
    Assignment(AssignmentCommand),
    /// Inspect agents.
    #[command(subcommand)]
    Agent(AgentCommand),
}

/// Pipeline verbs.
#[derive(Debug, Subcommand)]
pub enum PipelineCommand {
    /// Create a pipeline from a YAML spec file.
    Create {
        /// Human label for the pipeline.
        #[arg(long)]
        name: String,
        /// Create the pipeline disabled.
        #[arg(long)]
        disabled: bool,
        /// Path to the YAML pipeline spec.
        #[arg(long)]
        spec_file: PathBuf,
    },
    /// List all pipelines.
    List,
    /// Show one pipeline.
    Show {
        /// The pipeline identifier.
        id: String,
    },
    /// Update a pipeline. Flags that are omitted leave the field unchanged.
    Update {
        /// The pipeline identifier.
        id: String,
        /// New human label.
        #[arg(long)]
        name: Option<String>,
        /// New enabled gate: `true` or `false`. Omit to leave unchanged.
        #[arg(long)]
        enabled: Option<bool>,
        /// Path to a YAML pipeline spec replacing the current one.
        #[arg(long)]
        spec_file: Option<PathBuf>,
    },
    /// Delete a pipeline, cascading its assignments.
    Delete {
        /// The pipeline identifier.
        id: String,
    },
}

/// Assignment verbs.
#[derive(Debug, Subcommand)]
pub enum AssignmentCommand {
    /// Bind a pipeline to an (agent, region) pair.
    Create {
        /// The agent to bind to.
        #[arg(long)]
        agent: String,
        /// The region scope.
        #[arg(long)]
        region: String,
        /// The pipeline to bind.
        #[arg(long)]
        pipeline: String,
    },
    /// List all assignments.
    List,
    /// Delete an assignment.
    Delete {
        /// The assignment identifier.
        id: String,
    },
}

/// Agent verbs.
#[derive(Debug, Subcommand)]
pub enum AgentCommand {
    /// List registered agents with their computed status.
    List,
}
