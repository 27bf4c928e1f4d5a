// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Observix edge agent.
//!
//! The agent polls the control plane for its assignment view and converges
//! the set of running pipelines to match it. Each pipeline is a
//! self-contained concurrent unit (source task, batcher+processor task,
//! destination task around one bounded queue) so one sick pipeline cannot
//! starve another; the per-pipeline statistics block is the only state
//! they share.

pub mod config;
pub mod error;
pub mod stats;

mod batcher;
mod destination;
mod pipeline;
mod poll;
mod processor;
mod reconcile;
mod source;
mod status;

use crate::config::AgentConfig;
use crate::error::Error;
use crate::pipeline::PipelineHandle;
use crate::poll::ControlPlaneClient;
use crate::stats::{PipelineStatsSnapshot, StatsRegistry};
use observix_model::PipelineId;
use observix_model::catalog::{AssignedPipeline, AssignmentView};
use rand::RngExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The agent: reconciliation loop plus the pipelines it runs.
pub struct Agent {
    config: AgentConfig,
    client: ControlPlaneClient,
    cancel: CancellationToken,
    registry: StatsRegistry,
    running: HashMap<PipelineId, PipelineHandle>,
    last_revision: Option<String>,
}

impl Agent {
    /// Creates an agent from its configuration.
    pub fn new(config: AgentConfig) -> Result<Self, Error> {
        let client = ControlPlaneClient::new(
            &config.control_plane.url,
            &config.agent_id,
            &config.region,
        )?;
        Ok(Self {
            config,
            client,
            cancel: CancellationToken::new(),
            registry: StatsRegistry::new(),
            running: HashMap::new(),
            last_revision: None,
        })
    }

    /// Token that stops the agent when cancelled. Cancelling initiates a
    /// graceful shutdown: polling stops, then every pipeline is stopped
    /// subject to the shutdown deadline.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared handle onto the per-pipeline statistics, usable while the
    /// agent runs.
    #[must_use]
    pub fn stats_registry(&self) -> StatsRegistry {
        self.registry.clone()
    }

    /// A point-in-time snapshot of every pipeline's statistics.
    #[must_use]
    pub fn stats(&self) -> HashMap<String, PipelineStatsSnapshot> {
        self.registry.snapshot_all()
    }

    /// Runs the reconciliation loop until the cancel token fires, then
    /// shuts every pipeline down gracefully.
    pub async fn run(mut self) -> Result<(), Error> {
        if let Some(bind_address) = self.config.status_addr.clone() {
            let registry = self.registry.clone();
            let status_cancel = self.cancel.child_token();
            drop(tokio::spawn(async move {
                if let Err(e) = status::run(bind_address, registry, status_cancel).await {
                    error!(error = %e, "status server terminated");
                }
            }));
        }

        info!(
            agent_id = %self.config.agent_id,
            region = %self.config.region,
            "agent started"
        );

        loop {
            let cancel = self.cancel.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                () = self.reconcile_once() => {}
            }

            let cancel = self.cancel.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.jittered_interval()) => {}
            }
        }

        self.shutdown_all().await;
        info!(agent_id = %self.config.agent_id, "agent stopped");
        Ok(())
    }

    /// Drives one reconciliation cycle: poll, diff, apply.
    ///
    /// Poll and apply failures never propagate: they are logged (and, for
    /// pipelines, recorded as `Failed`) and retried on the next tick.
    pub async fn reconcile_once(&mut self) {
        match self
            .client
            .fetch_assignments(self.last_revision.as_deref())
            .await
        {
            Ok(None) => debug!("assignments unchanged"),
            Ok(Some(view)) => self.apply(view).await,
            Err(e) => warn!(error = %e, "assignment poll failed"),
        }
    }

    async fn apply(&mut self, view: AssignmentView) {
        let running_versions: HashMap<PipelineId, i64> = self
            .running
            .iter()
            .map(|(id, handle)| (id.clone(), handle.version))
            .collect();
        let plan = reconcile::plan(&view, &running_versions);
        debug!(
            revision = %view.revision,
            removals = plan.removals.len(),
            mutations = plan.mutations.len(),
            additions = plan.additions.len(),
            "applying assignment view"
        );

        for pipeline_id in &plan.removals {
            self.stop_pipeline(pipeline_id).await;
        }
        for assigned in &plan.mutations {
            self.stop_pipeline(&assigned.pipeline_id).await;
            self.start_pipeline(assigned).await;
        }
        for assigned in &plan.additions {
            self.start_pipeline(assigned).await;
        }

        self.last_revision = Some(view.revision);
    }

    async fn start_pipeline(&mut self, assigned: &AssignedPipeline) {
        let pipeline_id = &assigned.pipeline_id;
        let handle = match PipelineHandle::start(pipeline_id, assigned.version, &assigned.spec)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!(pipeline_id = %pipeline_id, error = %e, "pipeline failed to start");
                let handle = PipelineHandle::failed(assigned.version);
                handle.stats.record_error(e.to_string());
                handle
            }
        };
        self.registry
            .register(pipeline_id, handle.stats.clone(), handle.state.clone());
        let _ = self.running.insert(pipeline_id.clone(), handle);
    }

    async fn stop_pipeline(&mut self, pipeline_id: &str) {
        if let Some(handle) = self.running.remove(pipeline_id) {
            let clean = handle
                .stop(pipeline_id, self.config.shutdown_deadline())
                .await;
            if !clean {
                warn!(pipeline_id, "pipeline stop missed the shutdown deadline");
            }
        }
        self.registry.unregister(pipeline_id);
    }

    async fn shutdown_all(&mut self) {
        let pipeline_ids: Vec<PipelineId> = self.running.keys().cloned().collect();
        for pipeline_id in pipeline_ids {
            self.stop_pipeline(&pipeline_id).await;
        }
    }

    fn jittered_interval(&self) -> Duration {
        let base = self.config.poll_interval_seconds as f64;
        let factor = rand::rng().random_range(0.8..=1.2);
        Duration::from_secs_f64((base * factor).max(0.05))
    }
}
