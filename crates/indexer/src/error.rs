// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the indexer service.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running the indexer.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {details}")]
    ConfigRead {
        /// The path that failed to read.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file '{path}': {details}")]
    ConfigParse {
        /// The path that failed to parse.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },

    /// A profile definition under `profiles_dir` could not be loaded.
    #[error("Failed to load profile definition '{path}': {details}")]
    ProfileLoad {
        /// The profile file that failed to load.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The configured bind address is invalid and could not be parsed.
    #[error("Invalid bind address '{bind_address}': {details}")]
    InvalidBindAddress {
        /// The bind address that failed to parse.
        bind_address: String,
        /// Human-readable details of the parsing failure.
        details: String,
    },

    /// Failed to bind the TCP listener on the given address.
    #[error("Failed to bind indexer HTTP server on '{addr}': {details}")]
    BindFailed {
        /// The address we attempted to bind to.
        addr: String,
        /// Human-readable details of the bind failure.
        details: String,
    },

    /// The HTTP server encountered a fatal error while serving.
    #[error("Indexer HTTP server error on '{addr}': {details}")]
    ServerError {
        /// The address the server was bound to.
        addr: String,
        /// Human-readable details of the server failure.
        details: String,
    },
}
