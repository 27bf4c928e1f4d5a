// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Control-plane catalog records and the per-poll assignment view.

use crate::spec::PipelineSpec;
use crate::{AgentId, AssignmentId, PipelineId, Region};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pipeline record as stored by the control plane.
///
/// `version` increases strictly across successful updates; byte-identical
/// updates leave it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Server-assigned unique identifier, stable across updates.
    pub pipeline_id: PipelineId,
    /// Human label. Not unique.
    pub name: String,
    /// Gate: disabled pipelines are not run by agents.
    pub enabled: bool,
    /// The declarative pipeline description.
    pub spec: PipelineSpec,
    /// Monotonically increasing version, bumped on any spec/name/enabled change.
    pub version: i64,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// Liveness of an agent as computed from its last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The agent polled within the offline threshold.
    Online,
    /// The agent has not polled for longer than the offline threshold.
    Offline,
}

/// An agent registration, upserted on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Client-chosen identifier, unique within the control plane.
    pub agent_id: AgentId,
    /// Region the agent polls for.
    pub region: Region,
    /// First time this agent registered or polled.
    pub first_seen_at: DateTime<Utc>,
    /// Most recent poll.
    pub last_seen_at: DateTime<Utc>,
    /// Computed liveness; present on list responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
}

/// A binding between a pipeline and an (agent, region) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Server-assigned unique identifier.
    pub assignment_id: AssignmentId,
    /// The agent the pipeline is bound to.
    pub agent_id: AgentId,
    /// The region scope of the binding.
    pub region: Region,
    /// The pipeline being bound. Must exist at creation time.
    pub pipeline_id: PipelineId,
    /// When the binding was created.
    pub created_at: DateTime<Utc>,
}

/// One pipeline entry in an [`AssignmentView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedPipeline {
    /// The pipeline identifier.
    pub pipeline_id: PipelineId,
    /// The version the agent is expected to run.
    pub version: i64,
    /// Disabled pipelines are stopped by the agent, not started.
    pub enabled: bool,
    /// The declarative pipeline description.
    pub spec: PipelineSpec,
}

/// The per-poll response an agent reconciles against.
///
/// `revision` is an opaque token that changes iff the set of
/// `(pipeline_id, version, enabled)` tuples for this agent and region
/// changes. Agents echo the last-applied revision in `If-None-Match` to
/// short-circuit no-op reconciliations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentView {
    /// Content hash of what this agent should currently run.
    pub revision: String,
    /// The pipelines assigned to this agent and region.
    pub pipelines: Vec<AssignedPipeline>,
}
