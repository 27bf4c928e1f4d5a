// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-pipeline statistics.
//!
//! The stats block is the only state shared between a pipeline's tasks:
//! counters are atomics, the last-observed ok/error pair sits behind a
//! mutex. Snapshots are plain values and serialize onto the status
//! endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle state of a running pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// The pipeline is binding its source.
    Starting,
    /// All three tasks are up.
    Running,
    /// Stop was requested; tasks are draining.
    Stopping,
    /// All tasks exited, or the shutdown deadline elapsed.
    Stopped,
    /// The pipeline could not start. Retried only when its version changes.
    Failed,
}

/// The last destination error observed on a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    /// When the error was observed.
    pub at: DateTime<Utc>,
    /// The error message.
    pub message: String,
}

#[derive(Debug, Default)]
struct LastObserved {
    ok: Option<DateTime<Utc>>,
    err: Option<LastError>,
}

/// Live, shared statistics for one pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    recv: AtomicU64,
    dropped_queue_full: AtomicU64,
    sent_events: AtomicU64,
    sent_batches: AtomicU64,
    failed_batches: AtomicU64,
    buffer: AtomicU64,
    last: Mutex<LastObserved>,
}

impl PipelineStats {
    /// Creates a zeroed stats block.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// One event accepted by the source and queued.
    pub fn record_recv(&self) {
        let _ = self.recv.fetch_add(1, Ordering::Relaxed);
        let _ = self.buffer.fetch_add(1, Ordering::Relaxed);
    }

    /// One event discarded because the queue was full.
    pub fn record_queue_drop(&self) {
        let _ = self.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
    }

    /// One event pulled off the queue by the batcher.
    pub fn record_dequeue(&self) {
        let _ = self
            .buffer
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// A batch reached the destination; `events` of it were sent.
    pub fn record_batch_sent(&self, events: u64) {
        let _ = self.sent_events.fetch_add(events, Ordering::Relaxed);
        let _ = self.sent_batches.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.ok = Some(Utc::now());
    }

    /// A batch failed somewhere along the pipeline.
    pub fn record_batch_failed(&self, message: impl Into<String>) {
        let _ = self.failed_batches.fetch_add(1, Ordering::Relaxed);
        self.record_error(message);
    }

    /// Records an error without counting a failed batch.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.err = Some(LastError {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Current queue depth.
    #[must_use]
    pub fn buffer_depth(&self) -> u64 {
        self.buffer.load(Ordering::Relaxed)
    }

    /// Takes a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self, state: PipelineState) -> PipelineStatsSnapshot {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        PipelineStatsSnapshot {
            state,
            recv: self.recv.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            sent_events: self.sent_events.load(Ordering::Relaxed),
            sent_batches: self.sent_batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            buffer: self.buffer.load(Ordering::Relaxed),
            last_ok: last.ok,
            last_err: last.err.clone(),
        }
    }
}

/// A point-in-time copy of one pipeline's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatsSnapshot {
    /// Lifecycle state at snapshot time.
    pub state: PipelineState,
    /// Events accepted by the source.
    pub recv: u64,
    /// Events discarded because the queue was full.
    pub dropped_queue_full: u64,
    /// Events delivered to the destination.
    pub sent_events: u64,
    /// Batches delivered to the destination.
    pub sent_batches: u64,
    /// Batches that hit an indexer or destination error.
    pub failed_batches: u64,
    /// Queue depth at snapshot time.
    pub buffer: u64,
    /// Last successful destination send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ok: Option<DateTime<Utc>>,
    /// Last observed error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_err: Option<LastError>,
}

/// Shared lifecycle-state cell, readable by the stats registry.
#[derive(Debug, Clone)]
pub struct StateCell {
    state: Arc<Mutex<PipelineState>>,
}

impl StateCell {
    /// Creates a cell in the given state.
    #[must_use]
    pub fn new(state: PipelineState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Moves the pipeline to `state`.
    pub fn set(&self, state: PipelineState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// The current state.
    #[must_use]
    pub fn get(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug)]
struct RegisteredPipeline {
    stats: Arc<PipelineStats>,
    state: StateCell,
}

/// Registry of live pipeline statistics, shared between the reconciler and
/// the status endpoint.
#[derive(Debug, Clone, Default)]
pub struct StatsRegistry {
    pipelines: Arc<Mutex<HashMap<String, RegisteredPipeline>>>,
}

impl StatsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline's stats block and state cell.
    pub fn register(&self, pipeline_id: &str, stats: Arc<PipelineStats>, state: StateCell) {
        let mut pipelines = self.pipelines.lock().unwrap_or_else(|e| e.into_inner());
        let _ = pipelines.insert(
            pipeline_id.to_owned(),
            RegisteredPipeline { stats, state },
        );
    }

    /// Removes a pipeline from the registry.
    pub fn unregister(&self, pipeline_id: &str) {
        let mut pipelines = self.pipelines.lock().unwrap_or_else(|e| e.into_inner());
        let _ = pipelines.remove(pipeline_id);
    }

    /// Snapshot of one pipeline's statistics.
    #[must_use]
    pub fn snapshot(&self, pipeline_id: &str) -> Option<PipelineStatsSnapshot> {
        let pipelines = self.pipelines.lock().unwrap_or_else(|e| e.into_inner());
        pipelines
            .get(pipeline_id)
            .map(|p| p.stats.snapshot(p.state.get()))
    }

    /// Snapshot of every registered pipeline, keyed by pipeline id.
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<String, PipelineStatsSnapshot> {
        let pipelines = self.pipelines.lock().unwrap_or_else(|e| e.into_inner());
        pipelines
            .iter()
            .map(|(id, p)| (id.clone(), p.stats.snapshot(p.state.get())))
            .collect()
    }
}
