// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the control-plane service.

use observix_model::spec::SpecError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by catalog operations against the store.
///
/// Route handlers map these onto HTTP statuses and the shared
/// machine-readable error body.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{what} '{id}' not found")]
    NotFound {
        /// The kind of record that was looked up.
        what: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// An assignment for the same (agent, region, pipeline) already exists.
    #[error("assignment for agent '{agent_id}' region '{region}' pipeline '{pipeline_id}' already exists")]
    DuplicateAssignment {
        /// The agent of the colliding binding.
        agent_id: String,
        /// The region of the colliding binding.
        region: String,
        /// The pipeline of the colliding binding.
        pipeline_id: String,
    },

    /// A pipeline spec violated its invariants.
    #[error("invalid pipeline spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// The backing store failed. The enclosing write was rolled back.
    #[error("store error: {details}")]
    Backend {
        /// Human-readable details of the failure.
        details: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend {
            details: e.to_string(),
        }
    }
}

/// Errors that can occur while configuring or running the service.
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

    /// The store could not be opened or its schema initialized.
    #[error("Failed to open store '{database_url}': {details}")]
    StoreInit {
        /// The database URL that failed to open.
        database_url: String,
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

    /// A configured CORS origin is not a valid header value.
    #[error("Invalid allow_origins entry '{origin}'")]
    InvalidOrigin {
        /// The origin that failed to parse.
        origin: String,
    },

    /// Failed to bind the TCP listener on the given address.
    #[error("Failed to bind control-plane HTTP server on '{addr}': {details}")]
    BindFailed {
        /// The address we attempted to bind to.
        addr: String,
        /// Human-readable details of the bind failure.
        details: String,
    },

    /// The HTTP server encountered a fatal error while serving.
    #[error("Control-plane HTTP server error on '{addr}': {details}")]
    ServerError {
        /// The address the server was bound to.
        addr: String,
        /// Human-readable details of the server failure.
        details: String,
    },
}
