// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Wire contracts shared across services: request/response bodies and the
//! machine-readable error taxonomy surfaced to API clients.

use crate::spec::PipelineSpec;
use crate::{AgentId, PipelineId, Region};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Machine-readable error codes carried in [`ErrorBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A pipeline spec violated its invariants or failed to deserialize.
    InvalidSpec,
    /// The referenced record does not exist.
    NotFound,
    /// The write collides with an existing record.
    Conflict,
    /// The backing store failed; the write was not partially applied.
    StoreError,
    /// The requested normalization profile is not registered.
    UnknownProfile,
}

/// JSON error body returned by all Observix HTTP services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error code.
    pub error: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorBody {
    /// Creates an error body.
    pub fn new(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

/// Request body for `POST /v1/pipelines`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipelineRequest {
    /// Human label for the pipeline.
    pub name: String,
    /// Whether agents should run the pipeline. Defaults to enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The declarative pipeline description.
    pub spec: PipelineSpec,
}

fn default_enabled() -> bool {
    true
}

/// Response body for `POST /v1/pipelines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePipelineResponse {
    /// The server-assigned pipeline identifier.
    pub pipeline_id: PipelineId,
    /// Always 1 for a freshly created pipeline.
    pub version: i64,
}

/// Request body for `PUT /v1/pipelines/{id}`. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePipelineRequest {
    /// New human label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New enabled gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New pipeline description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PipelineSpec>,
}

/// Response body for `PUT /v1/pipelines/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePipelineResponse {
    /// The version after the update. Unchanged for byte-identical no-ops.
    pub version: i64,
}

/// Request body for `POST /v1/assignments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignmentRequest {
    /// The agent to bind the pipeline to.
    pub agent_id: AgentId,
    /// The region scope of the binding.
    pub region: Region,
    /// The pipeline to bind. Must exist.
    pub pipeline_id: PipelineId,
}

/// The `raw` field of a normalize request: one line, or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLines {
    /// A single string, split on newlines by the indexer.
    One(String),
    /// A pre-split batch of lines.
    Many(Vec<String>),
}

impl RawLines {
    /// Flattens into individual non-empty lines. A single string is split on
    /// `\n`; empty lines never produce documents.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        match self {
            RawLines::One(s) => s
                .split('\n')
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            RawLines::Many(lines) => lines.into_iter().filter(|l| !l.is_empty()).collect(),
        }
    }
}

/// Request body for `POST /v1/normalize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeRequest {
    /// The normalization profile to apply.
    pub profile: String,
    /// The raw line or lines to normalize.
    pub raw: RawLines,
}

/// One structured document produced by normalization.
///
/// The original line is preserved under `raw`; extracted fields are merged
/// at the top level of the document. Both the indexer and the agent pin
/// this shape with contract tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    /// The original raw line, always non-empty.
    pub raw: String,
    /// Extracted fields, flattened next to `raw`.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Doc {
    /// A document carrying only the raw line.
    pub fn passthrough(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// Response body for `POST /v1/normalize`. The key is fixed as `docs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeResponse {
    /// One document per input line, in input order.
    pub docs: Vec<Doc>,
}
