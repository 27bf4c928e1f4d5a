// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Assignment-view revision computation.

use observix_model::PipelineId;

/// Computes the opaque revision token for one agent's assignment view.
///
/// The token is a content hash over the sorted `(pipeline_id, version,
/// enabled)` tuples currently assigned to the agent and region: it changes
/// iff what the agent should run changes, and is insensitive to unrelated
/// pipelines or agents.
#[must_use]
pub fn compute_revision(tuples: &[(PipelineId, i64, bool)]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (pipeline_id, version, enabled) in tuples {
        hasher.update(pipeline_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(&version.to_be_bytes());
        hasher.update(&[u8::from(*enabled)]);
        hasher.update(b"\x1e");
    }
    hasher.finalize().to_hex().to_string()
}
