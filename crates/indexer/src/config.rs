// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Indexer service configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default cap on normalize request bodies, in bytes (1 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1_048_576;

/// Configuration for the indexer service, loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerConfig {
    /// Interface to bind the HTTP listener on.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port of the HTTP listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of file-defined normalization profiles. Optional; the
    /// built-in profiles are always registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,

    /// Requests larger than this are rejected with 413.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8300
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            profiles_dir: None,
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl IndexerConfig {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: IndexerConfig = serde_yaml::from_str("host: 0.0.0.0\n").expect("parse");
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8300);
        assert_eq!(cfg.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
        assert!(cfg.profiles_dir.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<IndexerConfig>("listen: 1234\n").is_err());
    }

    #[test]
    fn from_file_reads_yaml() {
        let mut f = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(f, "host: 127.0.0.1\nport: 9999\nmax_request_bytes: 64").expect("write");
        let cfg = IndexerConfig::from_file(f.path()).expect("load");
        assert_eq!(cfg.bind_address(), "127.0.0.1:9999");
        assert_eq!(cfg.max_request_bytes, 64);
    }
}
