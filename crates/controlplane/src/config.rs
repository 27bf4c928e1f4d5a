// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Control-plane service configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of seconds after which a silent agent is reported offline.
pub const DEFAULT_AGENT_OFFLINE_THRESHOLD_SECONDS: u64 = 20;

/// Configuration for the control-plane service, loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPlaneConfig {
    /// Interface to bind the HTTP listener on.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port of the HTTP listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database URL, e.g. `sqlite:observix.db`.
    pub database_url: String,

    /// An agent is reported offline once it has not polled for longer than
    /// this many seconds.
    #[serde(default = "default_agent_offline_threshold")]
    pub agent_offline_threshold_seconds: u64,

    /// Origins allowed by CORS. Empty disables cross-origin access.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8200
}

fn default_agent_offline_threshold() -> u64 {
    DEFAULT_AGENT_OFFLINE_THRESHOLD_SECONDS
}

impl ControlPlaneConfig {
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

    /// The `host:port` pair the HTTP listener binds.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
