// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline runtime: wiring, lifecycle, and graceful stop.
//!
//! A pipeline is three cooperating tasks joined by one bounded queue:
//!
//! ```text
//! [source] --push--> [bounded queue] --> [batcher+processor] --> [destination]
//! ```
//!
//! Stop closes the source first so no new events enter; dropping the
//! source's sender lets the batcher drain the queue, flush, and exit,
//! which in turn closes the destination's channel. Tasks still running at
//! the shutdown deadline are aborted and logged as abandoned.

use crate::batcher::{self, BatchLimits};
use crate::destination::Destination;
use crate::error::PipelineError;
use crate::processor::Processor;
use crate::source::Source;
use crate::stats::{PipelineState, PipelineStats, StateCell};
use observix_model::event::Event;
use observix_model::spec::PipelineSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A running (or failed) pipeline instance owned by the reconciler.
pub(crate) struct PipelineHandle {
    /// The pipeline version this instance was started from.
    pub(crate) version: i64,
    pub(crate) stats: Arc<PipelineStats>,
    pub(crate) state: StateCell,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl PipelineHandle {
    /// Starts a pipeline instance for `spec`.
    ///
    /// Binding the source is the gating step: a bind failure is returned
    /// and the pipeline never leaves `Starting`.
    pub(crate) async fn start(
        pipeline_id: &str,
        version: i64,
        spec: &PipelineSpec,
    ) -> Result<Self, PipelineError> {
        let state = StateCell::new(PipelineState::Starting);
        let stats = PipelineStats::new();
        let cancel = CancellationToken::new();

        let source = Source::bind(&spec.source).await?;
        let destination = Destination::open(&spec.destination).await?;
        let processor = Processor::from_spec(&spec.processor)?;

        let (queue_tx, queue_rx) = mpsc::channel::<Event>(spec.max_queue_size);
        let (batch_tx, batch_rx) = mpsc::channel::<Vec<Event>>(1);

        let limits = BatchLimits {
            max_events: spec.batch_max_events,
            max_dwell: spec.batch_dwell(),
        };

        let tasks = vec![
            (
                "source",
                tokio::spawn(source.run(queue_tx, stats.clone(), cancel.clone())),
            ),
            (
                "batcher",
                tokio::spawn(batcher::run(
                    queue_rx,
                    batch_tx,
                    limits,
                    processor,
                    stats.clone(),
                )),
            ),
            (
                "destination",
                tokio::spawn(destination.run(batch_rx, stats.clone())),
            ),
        ];

        state.set(PipelineState::Running);
        info!(pipeline_id, version, "pipeline running");

        Ok(Self {
            version,
            stats,
            state,
            cancel,
            tasks,
        })
    }

    /// A placeholder for a pipeline that failed to start. It keeps the
    /// version registered so the reconciler only retries when the version
    /// changes.
    pub(crate) fn failed(version: i64) -> Self {
        let state = StateCell::new(PipelineState::Failed);
        Self {
            version,
            stats: PipelineStats::new(),
            state,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Whether this instance failed to start.
    pub(crate) fn is_failed(&self) -> bool {
        self.state.get() == PipelineState::Failed
    }

    /// Stops the pipeline: closes the source, drains, and joins all tasks
    /// within `deadline`. Returns `false` when any task had to be
    /// abandoned.
    pub(crate) async fn stop(mut self, pipeline_id: &str, deadline: Duration) -> bool {
        if self.is_failed() {
            return true;
        }
        self.state.set(PipelineState::Stopping);
        self.cancel.cancel();

        let give_up_at = Instant::now() + deadline;
        let mut clean = true;
        for (name, mut task) in self.tasks.drain(..) {
            let remaining = give_up_at.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, &mut task).await {
                Ok(_) => {}
                Err(_) => {
                    warn!(pipeline_id, task = name, "task abandoned at shutdown deadline");
                    task.abort();
                    clean = false;
                }
            }
        }

        self.state.set(PipelineState::Stopped);
        info!(pipeline_id, version = self.version, clean, "pipeline stopped");
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observix_model::spec::{DestinationSpec, ProcessorSpec, SourceSpec};
    use tokio::net::UdpSocket;

    fn spec(source_port: u16, dest_port: u16) -> PipelineSpec {
        PipelineSpec {
            source: SourceSpec::SyslogUdp {
                host: "127.0.0.1".into(),
                port: source_port,
            },
            processor: ProcessorSpec::Raw,
            destination: DestinationSpec::SyslogUdp {
                host: "127.0.0.1".into(),
                port: dest_port,
                pri: 14,
                appname: "observix".into(),
                hostname: "edge".into(),
            },
            batch_max_events: 2,
            batch_max_seconds: 0.2,
            max_queue_size: 100,
        }
    }

    #[tokio::test]
    async fn bind_conflict_fails_the_start() {
        let port = portpicker::pick_unused_port().expect("free port");
        let holder = UdpSocket::bind(("127.0.0.1", port)).await.expect("hold port");
        let result = PipelineHandle::start("p1", 1, &spec(port, 19)).await;
        assert!(matches!(result, Err(PipelineError::SourceBind { .. })));
        drop(holder);
    }

    #[tokio::test]
    async fn stop_releases_the_source_port() {
        let source_port = portpicker::pick_unused_port().expect("free port");
        let dest_port = portpicker::pick_unused_port().expect("free port");
        let handle = PipelineHandle::start("p1", 1, &spec(source_port, dest_port))
            .await
            .expect("start");
        assert_eq!(handle.state.get(), PipelineState::Running);

        let clean = handle.stop("p1", Duration::from_secs(5)).await;
        assert!(clean);

        // The port is free again once the source task has exited.
        let rebound = UdpSocket::bind(("127.0.0.1", source_port)).await;
        assert!(rebound.is_ok());
    }

    #[tokio::test]
    async fn failed_placeholder_stops_cleanly() {
        let handle = PipelineHandle::failed(3);
        assert!(handle.is_failed());
        assert_eq!(handle.version, 3);
        assert!(handle.stop("p1", Duration::from_millis(10)).await);
    }
}
