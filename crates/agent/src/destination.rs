// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline destinations.
//!
//! The destination task receives post-processor batches and emits one
//! record per event. Sends are best-effort: a per-event error is recorded
//! and the remainder of the batch is still attempted.

use crate::error::PipelineError;
use crate::stats::PipelineStats;
use chrono::{DateTime, Utc};
use observix_model::event::Event;
use observix_model::spec::DestinationSpec;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::debug;

/// Formats one event as an RFC3164-style BSD syslog line:
/// `<PRI>MMM dd HH:MM:SS HOSTNAME APPNAME: RAW`.
///
/// The event timestamp is used when present, `received_at` otherwise.
pub(crate) fn rfc3164_frame(
    event: &Event,
    pri: u8,
    hostname: &str,
    appname: &str,
    received_at: DateTime<Utc>,
) -> String {
    let ts = event.ts_or(received_at).format("%b %e %H:%M:%S");
    format!("<{pri}>{ts} {hostname} {appname}: {raw}", raw = event.raw)
}

/// A ready destination writer.
pub(crate) enum Destination {
    /// One RFC3164 UDP datagram per event.
    SyslogUdp {
        socket: UdpSocket,
        peer: SocketAddr,
        pri: u8,
        appname: String,
        hostname: String,
    },
    /// One framed line per event on stdout.
    Console,
}

impl Destination {
    /// Prepares the writer described by `spec`: resolves the peer and opens
    /// the local socket.
    pub(crate) async fn open(spec: &DestinationSpec) -> Result<Self, PipelineError> {
        match spec {
            DestinationSpec::SyslogUdp {
                host,
                port,
                pri,
                appname,
                hostname,
            } => {
                let addr = format!("{host}:{port}");
                let peer = tokio::net::lookup_host(&addr)
                    .await
                    .map_err(|e| PipelineError::DestinationResolve {
                        addr: addr.clone(),
                        details: e.to_string(),
                    })?
                    .next()
                    .ok_or_else(|| PipelineError::DestinationResolve {
                        addr: addr.clone(),
                        details: "no addresses".to_owned(),
                    })?;
                let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(|e| {
                    PipelineError::DestinationSocket {
                        details: e.to_string(),
                    }
                })?;
                Ok(Self::SyslogUdp {
                    socket,
                    peer,
                    pri: *pri,
                    appname: appname.clone(),
                    hostname: hostname.clone(),
                })
            }
            DestinationSpec::Console => Ok(Self::Console),
        }
    }

    /// Consumes batches until the channel closes.
    pub(crate) async fn run(self, mut batches: mpsc::Receiver<Vec<Event>>, stats: Arc<PipelineStats>) {
        while let Some(batch) = batches.recv().await {
            self.send_batch(&batch, &stats).await;
        }
        debug!("destination stopping");
    }

    async fn send_batch(&self, batch: &[Event], stats: &PipelineStats) {
        let received_at = Utc::now();
        let mut sent = 0u64;
        let mut first_error: Option<String> = None;
        for event in batch {
            match self.send_event(event, received_at).await {
                Ok(()) => sent += 1,
                Err(message) => {
                    if first_error.is_none() {
                        first_error = Some(message);
                    }
                }
            }
        }
        if sent > 0 {
            stats.record_batch_sent(sent);
        }
        if let Some(message) = first_error {
            stats.record_batch_failed(message);
        }
    }

    async fn send_event(&self, event: &Event, received_at: DateTime<Utc>) -> Result<(), String> {
        match self {
            Destination::SyslogUdp {
                socket,
                peer,
                pri,
                appname,
                hostname,
            } => {
                let frame = rfc3164_frame(event, *pri, hostname, appname, received_at);
                socket
                    .send_to(frame.as_bytes(), peer)
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("destination send error: {e}"))
            }
            Destination::Console => {
                let frame = rfc3164_frame(
                    event,
                    observix_model::spec::DEFAULT_SYSLOG_PRI,
                    "localhost",
                    "observix",
                    received_at,
                );
                #[allow(clippy::print_stdout)]
                {
                    println!("{frame}");
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn frame_follows_bsd_layout() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 7, 13, 5, 9).single().expect("ts");
        let mut event = Event::new("hello world");
        event.ts = Some(ts);
        let frame = rfc3164_frame(&event, 14, "edge-1", "observix", Utc::now());
        assert_eq!(frame, "<14>Mar  7 13:05:09 edge-1 observix: hello world");
    }

    #[test]
    fn frame_falls_back_to_receive_time() {
        let received = Utc.with_ymd_and_hms(2026, 11, 23, 1, 2, 3).single().expect("ts");
        let event = Event {
            raw: "x".into(),
            ts: None,
            source_addr: None,
            meta: std::collections::BTreeMap::new(),
        };
        let frame = rfc3164_frame(&event, 30, "h", "app", received);
        assert_eq!(frame, "<30>Nov 23 01:02:03 h app: x");
    }

    #[tokio::test]
    async fn batch_send_updates_stats_and_preserves_order() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let port = receiver.local_addr().expect("addr").port();
        let spec = DestinationSpec::SyslogUdp {
            host: "127.0.0.1".into(),
            port,
            pri: 14,
            appname: "observix".into(),
            hostname: "edge".into(),
        };
        let destination = Destination::open(&spec).await.expect("open");
        let stats = PipelineStats::new();

        let batch = vec![Event::new("a"), Event::new("b")];
        destination.send_batch(&batch, &stats).await;

        let mut buf = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buf).await.expect("recv");
        let first = String::from_utf8_lossy(&buf[..len]).into_owned();
        assert!(first.ends_with("observix: a"), "frame was {first}");
        let (len, _) = receiver.recv_from(&mut buf).await.expect("recv");
        let second = String::from_utf8_lossy(&buf[..len]).into_owned();
        assert!(second.ends_with("observix: b"), "frame was {second}");

        let snap = stats.snapshot(crate::stats::PipelineState::Running);
        assert_eq!(snap.sent_events, 2);
        assert_eq!(snap.sent_batches, 1);
        assert_eq!(snap.failed_batches, 0);
        assert!(snap.last_ok.is_some());
    }
}
