// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared data model for the Observix log-forwarding platform.
//!
//! This crate defines the vocabulary every Observix service speaks: the
//! [`event::Event`] unit of work flowing through agent pipelines, the
//! declarative [`spec::PipelineSpec`] stored by the control plane, the
//! catalog records exchanged on the control-plane API, and the wire
//! contracts shared with the indexer.

pub mod api;
pub mod catalog;
pub mod event;
pub mod spec;

/// Identifier of a pipeline record, assigned by the control plane.
pub type PipelineId = String;

/// Identifier of an assignment record, assigned by the control plane.
pub type AssignmentId = String;

/// Identifier of an agent, chosen by the agent operator.
pub type AgentId = String;

/// Region tag scoping assignments. Agents poll for a fixed region.
pub type Region = String;
