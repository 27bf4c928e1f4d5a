// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Declarative pipeline specification.
//!
//! The source/processor/destination blobs are discriminated unions: a small
//! enum of kinds, each with a typed option record, validated at
//! deserialization time. Unknown kinds fail serde deserialization and are
//! surfaced by the control plane as `invalid_spec`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the bounded per-pipeline event queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1024;

/// Default indexer request timeout, in seconds.
pub const DEFAULT_INDEXER_TIMEOUT_SECONDS: f64 = 3.0;

/// Default RFC3164 PRI value (facility 1 `user`, severity 6 `info`).
pub const DEFAULT_SYSLOG_PRI: u8 = 14;

/// Errors raised when a pipeline spec violates its invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    /// `batch_max_events` must admit at least one event per batch.
    #[error("batch_max_events must be >= 1")]
    BatchMaxEventsZero,

    /// `batch_max_seconds` must be a positive, finite dwell time.
    #[error("batch_max_seconds must be a positive number, got {value}")]
    BatchMaxSecondsNotPositive {
        /// The rejected value.
        value: f64,
    },

    /// `max_queue_size` must admit at least one buffered event.
    #[error("max_queue_size must be >= 1")]
    MaxQueueSizeZero,

    /// A network endpoint option is missing its host.
    #[error("{endpoint} host must not be empty")]
    EmptyHost {
        /// Which endpoint the empty host was found on.
        endpoint: &'static str,
    },

    /// Indexed mode requires a non-empty indexer URL.
    #[error("indexed processor requires a non-empty indexer_url")]
    EmptyIndexerUrl,

    /// Indexed mode requires a non-empty profile name.
    #[error("indexed processor requires a non-empty profile")]
    EmptyProfile,

    /// The indexer request timeout must be positive and finite.
    #[error("timeout_seconds must be a positive number, got {value}")]
    TimeoutNotPositive {
        /// The rejected value.
        value: f64,
    },
}

/// Where a pipeline ingests events from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Bind a UDP socket and treat every datagram as one raw log line.
    SyslogUdp {
        /// Interface to bind, e.g. `127.0.0.1` or `0.0.0.0`.
        host: String,
        /// UDP port to bind.
        port: u16,
    },
}

/// How a pipeline transforms batches before forwarding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProcessorSpec {
    /// Forward batches unchanged.
    Raw,

    /// Round-trip each batch through the indexer's normalize endpoint.
    Indexed {
        /// Base URL of the indexer service.
        indexer_url: String,
        /// Normalization profile to apply, e.g. `json_auto`.
        profile: String,
        /// Per-request timeout for the normalize call, in seconds.
        #[serde(default = "default_indexer_timeout")]
        timeout_seconds: f64,
        /// On indexer failure, pass the original batch through unnormalized
        /// instead of dropping it.
        #[serde(default = "default_fallback_to_raw")]
        fallback_to_raw: bool,
    },
}

fn default_indexer_timeout() -> f64 {
    DEFAULT_INDEXER_TIMEOUT_SECONDS
}

fn default_fallback_to_raw() -> bool {
    true
}

/// Where a pipeline forwards events to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationSpec {
    /// Emit one RFC3164-framed UDP datagram per event.
    SyslogUdp {
        /// Remote host to send datagrams to.
        host: String,
        /// Remote UDP port.
        port: u16,
        /// RFC3164 PRI value (`facility * 8 + severity`).
        #[serde(default = "default_syslog_pri")]
        pri: u8,
        /// APP-NAME field of the outgoing frame.
        #[serde(default = "default_appname")]
        appname: String,
        /// HOSTNAME field of the outgoing frame.
        #[serde(default = "default_hostname")]
        hostname: String,
    },

    /// Write one framed record per event to standard output.
    Console,
}

fn default_syslog_pri() -> u8 {
    DEFAULT_SYSLOG_PRI
}

fn default_appname() -> String {
    "observix".to_owned()
}

fn default_hostname() -> String {
    "localhost".to_owned()
}

/// Declarative description of one pipeline: a source, a processor, a
/// destination, and the batching parameters tying them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Where events enter the pipeline.
    pub source: SourceSpec,

    /// How batches are transformed before forwarding.
    pub processor: ProcessorSpec,

    /// Where events leave the pipeline.
    pub destination: DestinationSpec,

    /// Flush a batch once it holds this many events.
    pub batch_max_events: usize,

    /// Flush a batch once its first event has waited this many seconds.
    pub batch_max_seconds: f64,

    /// Capacity of the bounded queue between source and batcher. The source
    /// drops the newest event when the queue is full.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

impl PipelineSpec {
    /// Checks the spec invariants. The control plane rejects any write whose
    /// spec fails this check.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.batch_max_events < 1 {
            return Err(SpecError::BatchMaxEventsZero);
        }
        if !(self.batch_max_seconds.is_finite() && self.batch_max_seconds > 0.0) {
            return Err(SpecError::BatchMaxSecondsNotPositive {
                value: self.batch_max_seconds,
            });
        }
        if self.max_queue_size < 1 {
            return Err(SpecError::MaxQueueSizeZero);
        }
        match &self.source {
            SourceSpec::SyslogUdp { host, .. } => {
                if host.is_empty() {
                    return Err(SpecError::EmptyHost { endpoint: "source" });
                }
            }
        }
        if let ProcessorSpec::Indexed {
            indexer_url,
            profile,
            timeout_seconds,
            ..
        } = &self.processor
        {
            if indexer_url.is_empty() {
                return Err(SpecError::EmptyIndexerUrl);
            }
            if profile.is_empty() {
                return Err(SpecError::EmptyProfile);
            }
            if !(timeout_seconds.is_finite() && *timeout_seconds > 0.0) {
                return Err(SpecError::TimeoutNotPositive {
                    value: *timeout_seconds,
                });
            }
        }
        if let DestinationSpec::SyslogUdp { host, .. } = &self.destination {
            if host.is_empty() {
                return Err(SpecError::EmptyHost {
                    endpoint: "destination",
                });
            }
        }
        Ok(())
    }

    /// Maximum dwell time of a batch as a [`Duration`], clamped to one day.
    #[must_use]
    pub fn batch_dwell(&self) -> Duration {
        Duration::from_secs_f64(self.batch_max_seconds.clamp(0.001, 86_400.0))
    }
}
