// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Agent service configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default seconds between assignment polls.
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;

/// Default seconds granted to a stopping pipeline before its tasks are
/// abandoned.
pub const DEFAULT_SHUTDOWN_DEADLINE_SECONDS: u64 = 5;

/// Reference to the control plane this agent reconciles against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPlaneRef {
    /// Base URL of the control plane, e.g. `http://127.0.0.1:8200`.
    pub url: String,
}

/// Configuration for the agent, loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Identifier this agent registers under. Unique within the control
    /// plane.
    pub agent_id: String,

    /// Region this agent polls assignments for.
    pub region: String,

    /// The control plane to reconcile against.
    pub control_plane: ControlPlaneRef,

    /// Seconds between assignment polls. Each tick is jittered by ±20%.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Seconds granted to each stopping pipeline before its tasks are
    /// abandoned.
    #[serde(default = "default_shutdown_deadline")]
    pub shutdown_deadline_seconds: u64,

    /// Optional `host:port` for the local status HTTP listener.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_addr: Option<String>,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_shutdown_deadline() -> u64 {
    DEFAULT_SHUTDOWN_DEADLINE_SECONDS
}

impl AgentConfig {
    /// Loads the configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        serde_yaml::from_str(&contents).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// The configured shutdown deadline as a [`Duration`].
    #[must_use]
    pub fn shutdown_deadline(&self) -> Duration {
        Duration::from_secs(self.shutdown_deadline_seconds)
    }
}
