// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! The batcher+processor task.
//!
//! Drains the pipeline queue into a buffer and flushes it whenever it
//! reaches `batch_max_events`, or once `batch_max_seconds` has elapsed
//! since the first buffered event. Empty ticks never produce batches.
//! When the source closes the queue, the remaining events are drained,
//! flushed, and the task exits, closing the batch channel behind it.

use crate::processor::Processor;
use crate::stats::PipelineStats;
use observix_model::event::Event;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Size and dwell bounds for one pipeline's batches.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BatchLimits {
    /// Flush once the buffer holds this many events.
    pub max_events: usize,
    /// Flush once the first buffered event has waited this long.
    pub max_dwell: Duration,
}

/// Runs the batcher until the queue closes.
pub(crate) async fn run(
    mut queue: mpsc::Receiver<Event>,
    batches: mpsc::Sender<Vec<Event>>,
    limits: BatchLimits,
    processor: Processor,
    stats: Arc<PipelineStats>,
) {
    let mut buffer: Vec<Event> = Vec::with_capacity(limits.max_events);
    let mut deadline = Instant::now();

    loop {
        if buffer.is_empty() {
            // Nothing buffered: block until the next event or queue close.
            match queue.recv().await {
                Some(event) => {
                    stats.record_dequeue();
                    buffer.push(event);
                    deadline = Instant::now() + limits.max_dwell;
                    if buffer.len() >= limits.max_events
                        && !flush(&mut buffer, &batches, &processor, &stats).await
                    {
                        return;
                    }
                }
                None => break,
            }
        } else {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    if !flush(&mut buffer, &batches, &processor, &stats).await {
                        return;
                    }
                }

                received = queue.recv() => match received {
                    Some(event) => {
                        stats.record_dequeue();
                        buffer.push(event);
                        if buffer.len() >= limits.max_events
                            && !flush(&mut buffer, &batches, &processor, &stats).await
                        {
                            return;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Source closed: flush whatever is left and let the destination finish.
    if !buffer.is_empty() {
        let _ = flush(&mut buffer, &batches, &processor, &stats).await;
    }
    debug!("batcher stopping");
}

/// Processes and forwards the buffered batch. Returns `false` when the
/// destination is gone and the task should exit.
async fn flush(
    buffer: &mut Vec<Event>,
    batches: &mpsc::Sender<Vec<Event>>,
    processor: &Processor,
    stats: &PipelineStats,
) -> bool {
    let batch = std::mem::take(buffer);
    let outgoing = processor.process(batch, stats).await;
    if outgoing.is_empty() {
        return true;
    }
    batches.send(outgoing).await.is_ok()
}
