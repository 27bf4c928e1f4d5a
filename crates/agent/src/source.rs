// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline sources.
//!
//! The source task owns the inbound socket. It never blocks the receive
//! loop on a full queue: the newest event is dropped and counted instead.

use crate::error::PipelineError;
use crate::stats::PipelineStats;
use observix_model::event::Event;
use observix_model::spec::SourceSpec;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const MAX_DATAGRAM_BYTES: usize = 64 * 1024;

/// A bound source, ready to feed the pipeline queue.
pub(crate) struct Source {
    socket: UdpSocket,
}

impl Source {
    /// Binds the source socket described by `spec`.
    pub(crate) async fn bind(spec: &SourceSpec) -> Result<Self, PipelineError> {
        match spec {
            SourceSpec::SyslogUdp { host, port } => {
                let addr = format!("{host}:{port}");
                let socket = UdpSocket::bind(&addr)
                    .await
                    .map_err(|e| PipelineError::SourceBind {
                        addr,
                        details: e.to_string(),
                    })?;
                Ok(Self { socket })
            }
        }
    }

    /// Receives datagrams until cancelled, pushing events into the bounded
    /// queue. Dropping the sender on exit is what lets the batcher drain
    /// and finish.
    pub(crate) async fn run(
        self,
        tx: mpsc::Sender<Event>,
        stats: Arc<PipelineStats>,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("source stopping");
                    break;
                }

                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            let raw = String::from_utf8_lossy(&buf[..len]).into_owned();
                            if raw.is_empty() {
                                continue;
                            }
                            let event = Event::with_source(raw, peer);
                            match tx.try_send(event) {
                                Ok(()) => stats.record_recv(),
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    stats.record_queue_drop();
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "source receive error");
                        }
                    }
                }
            }
        }
    }
}
