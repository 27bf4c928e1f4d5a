// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the agent.
//!
//! Data-plane errors are classified per stage: a pipeline that cannot start
//! surfaces a [`PipelineError`], per-batch indexer failures surface an
//! [`IndexerError`] recorded into statistics, and poll failures surface a
//! [`PollError`] that is logged and retried on the next tick.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running the agent process.
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

    /// The HTTP client for the control plane could not be constructed.
    #[error("Failed to build control-plane HTTP client: {details}")]
    HttpClient {
        /// Human-readable details of the failure.
        details: String,
    },

    /// The configured status listener address is invalid.
    #[error("Invalid status_addr '{bind_address}': {details}")]
    InvalidBindAddress {
        /// The bind address that failed to parse.
        bind_address: String,
        /// Human-readable details of the parsing failure.
        details: String,
    },

    /// Failed to bind the status listener.
    #[error("Failed to bind agent status server on '{addr}': {details}")]
    BindFailed {
        /// The address we attempted to bind to.
        addr: String,
        /// Human-readable details of the bind failure.
        details: String,
    },

    /// The status HTTP server encountered a fatal error while serving.
    #[error("Agent status server error on '{addr}': {details}")]
    ServerError {
        /// The address the server was bound to.
        addr: String,
        /// Human-readable details of the server failure.
        details: String,
    },
}

/// Errors that prevent a pipeline from starting. A pipeline hitting one of
/// these enters the `Failed` state and is retried only when its version
/// changes.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source socket could not be bound.
    #[error("Failed to bind source on '{addr}': {details}")]
    SourceBind {
        /// The address we attempted to bind to.
        addr: String,
        /// Human-readable details of the bind failure.
        details: String,
    },

    /// The destination address could not be resolved.
    #[error("Failed to resolve destination '{addr}': {details}")]
    DestinationResolve {
        /// The address that failed to resolve.
        addr: String,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The local socket for the destination could not be created.
    #[error("Failed to open destination socket: {details}")]
    DestinationSocket {
        /// Human-readable details of the failure.
        details: String,
    },

    /// The HTTP client for the indexer could not be constructed.
    #[error("Failed to build indexer HTTP client: {details}")]
    IndexerClient {
        /// Human-readable details of the failure.
        details: String,
    },
}

/// Errors from one assignment poll. Logged and retried on the next tick.
#[derive(Error, Debug)]
pub enum PollError {
    /// The request could not be sent or timed out.
    #[error("poll transport error: {details}")]
    Transport {
        /// Human-readable details of the failure.
        details: String,
    },

    /// The control plane answered with an unexpected status.
    #[error("poll rejected with HTTP {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body did not parse as an assignment view.
    #[error("malformed assignment view: {details}")]
    Malformed {
        /// Human-readable details of the failure.
        details: String,
    },
}

/// Errors from one indexer round-trip. Recorded per batch; the batch is
/// handled according to the pipeline's `fallback_to_raw` option.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// The request could not be sent or timed out.
    #[error("indexer unreachable: {details}")]
    Transport {
        /// Human-readable details of the failure.
        details: String,
    },

    /// The indexer answered with a non-2xx status.
    #[error("indexer rejected batch with HTTP {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body did not parse as a normalize response.
    #[error("malformed normalize response: {details}")]
    Malformed {
        /// Human-readable details of the failure.
        details: String,
    },

    /// A returned document was missing its raw payload.
    #[error("normalize response contained a document with an empty raw field")]
    EmptyRaw,
}
