// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end agent tests: a wiremock control plane hands out assignment
//! views, real UDP sockets play source peers and destination sinks.

use observix_agent::Agent;
use observix_agent::config::{AgentConfig, ControlPlaneRef};
use observix_agent::stats::{PipelineState, StatsRegistry};
use observix_model::catalog::{AssignedPipeline, AssignmentView};
use observix_model::spec::{DestinationSpec, PipelineSpec, ProcessorSpec, SourceSpec};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn raw_spec(source_port: u16, dest_port: u16) -> PipelineSpec {
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
        batch_max_seconds: 0.3,
        max_queue_size: 100,
    }
}

fn assigned(id: &str, version: i64, spec: PipelineSpec) -> AssignedPipeline {
    AssignedPipeline {
        pipeline_id: id.to_owned(),
        version,
        enabled: true,
        spec,
    }
}

async fn mount_view(server: &MockServer, revision: &str, pipelines: Vec<AssignedPipeline>) {
    server.reset().await;
    let view = AssignmentView {
        revision: revision.to_owned(),
        pipelines,
    };
    Mock::given(method("GET"))
        .and(path("/v1/agents/agent-a/assignments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::to_value(&view).expect("view json")),
        )
        .mount(server)
        .await;
}

async fn start_agent(control_plane_url: &str) -> (StatsRegistry, CancellationToken) {
    let config = AgentConfig {
        agent_id: "agent-a".into(),
        region: "eu-west-1".into(),
        control_plane: ControlPlaneRef {
            url: control_plane_url.to_owned(),
        },
        poll_interval_seconds: 0,
        shutdown_deadline_seconds: 5,
        status_addr: None,
    };
    let agent = Agent::new(config).expect("agent");
    let registry = agent.stats_registry();
    let cancel = agent.cancel_token();
    drop(tokio::spawn(agent.run()));
    (registry, cancel)
}

async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn recv_frame(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 2048];
    let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf))
        .await
        .expect("datagram deadline")
        .expect("recv");
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[tokio::test]
async fn raw_forwarder_delivers_in_order_and_batches() {
    let control_plane = MockServer::start().await;
    let source_port = portpicker::pick_unused_port().expect("free port");
    let sink = UdpSocket::bind("127.0.0.1:0").await.expect("sink");
    let dest_port = sink.local_addr().expect("addr").port();

    mount_view(
        &control_plane,
        "rev-1",
        vec![assigned("p1", 1, raw_spec(source_port, dest_port))],
    )
    .await;
    let (registry, cancel) = start_agent(&control_plane.uri()).await;
    wait_for("pipeline running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");
    let target = format!("127.0.0.1:{source_port}");
    for raw in ["a", "b", "c"] {
        let _ = sender.send_to(raw.as_bytes(), &target).await.expect("send");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(recv_frame(&sink).await.ends_with(": a"));
    assert!(recv_frame(&sink).await.ends_with(": b"));
    assert!(recv_frame(&sink).await.ends_with(": c"));

    wait_for("stats settled", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.sent_events == 3 && s.sent_batches == 2)
    })
    .await;
    let snap = registry.snapshot("p1").expect("snapshot");
    assert_eq!(snap.recv, 3);
    assert_eq!(snap.dropped_queue_full, 0);
    assert_eq!(snap.failed_batches, 0);
    assert!(snap.last_ok.is_some());

    cancel.cancel();
}

#[tokio::test]
async fn reconcile_adds_removes_and_restarts_on_version_change() {
    let control_plane = MockServer::start().await;
    let port_one = portpicker::pick_unused_port().expect("free port");
    let port_two = portpicker::pick_unused_port().expect("free port");
    let port_three = portpicker::pick_unused_port().expect("free port");
    let sink = UdpSocket::bind("127.0.0.1:0").await.expect("sink");
    let dest_port = sink.local_addr().expect("addr").port();

    // One pipeline to begin with.
    mount_view(
        &control_plane,
        "rev-1",
        vec![assigned("p1", 1, raw_spec(port_one, dest_port))],
    )
    .await;
    let (registry, cancel) = start_agent(&control_plane.uri()).await;
    wait_for("p1 running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    // A second assignment appears.
    mount_view(
        &control_plane,
        "rev-2",
        vec![
            assigned("p1", 1, raw_spec(port_one, dest_port)),
            assigned("p2", 1, raw_spec(port_two, dest_port)),
        ],
    )
    .await;
    wait_for("p2 running", || {
        registry
            .snapshot("p2")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    // The first assignment is deleted; the second mutates to a new version
    // listening on a different port.
    mount_view(
        &control_plane,
        "rev-3",
        vec![assigned("p2", 2, raw_spec(port_three, dest_port))],
    )
    .await;
    wait_for("p1 stopped", || registry.snapshot("p1").is_none()).await;
    wait_for("p2 restarted", || {
        registry
            .snapshot("p2")
            .is_some_and(|s| s.state == PipelineState::Running && s.recv == 0)
    })
    .await;

    // The old port is released, the new one is live.
    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");
    let _ = sender
        .send_to(b"fresh", format!("127.0.0.1:{port_three}"))
        .await
        .expect("send");
    assert!(recv_frame(&sink).await.ends_with(": fresh"));
    let rebound = UdpSocket::bind(("127.0.0.1", port_one)).await;
    assert!(rebound.is_ok(), "removed pipeline still holds its port");

    cancel.cancel();
}

#[tokio::test]
async fn indexed_pipeline_normalizes_and_falls_back_on_outage() {
    let control_plane = MockServer::start().await;
    let indexer = MockServer::start().await;
    let source_port = portpicker::pick_unused_port().expect("free port");
    let sink = UdpSocket::bind("127.0.0.1:0").await.expect("sink");
    let dest_port = sink.local_addr().expect("addr").port();

    let mut spec = raw_spec(source_port, dest_port);
    spec.batch_max_events = 1;
    spec.processor = ProcessorSpec::Indexed {
        indexer_url: indexer.uri(),
        profile: "json_auto".into(),
        timeout_seconds: 1.0,
        fallback_to_raw: true,
    };

    // Happy path: the indexer answers with a normalized doc.
    Mock::given(method("POST"))
        .and(path("/v1/normalize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "docs": [ { "raw": "{\"k\":1}", "k": 1 } ] }),
        ))
        .mount(&indexer)
        .await;
    mount_view(&control_plane, "rev-1", vec![assigned("p1", 1, spec)]).await;
    let (registry, cancel) = start_agent(&control_plane.uri()).await;
    wait_for("pipeline running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");
    let target = format!("127.0.0.1:{source_port}");
    let _ = sender
        .send_to(b"{\"k\":1}", &target)
        .await
        .expect("send");
    let frame = recv_frame(&sink).await;
    assert!(frame.contains("{\"k\":1}"), "frame was {frame}");

    // Outage: every batch still reaches the destination via fallback.
    indexer.reset().await;
    Mock::given(method("POST"))
        .and(path("/v1/normalize"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&indexer)
        .await;

    for i in 0..5 {
        let _ = sender
            .send_to(format!("line-{i}").as_bytes(), &target)
            .await
            .expect("send");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    for i in 0..5 {
        let frame = recv_frame(&sink).await;
        assert!(frame.ends_with(&format!(": line-{i}")), "frame was {frame}");
    }

    let snap = registry.snapshot("p1").expect("snapshot");
    assert!(snap.failed_batches >= 1);
    assert!(snap.last_err.is_some());

    cancel.cancel();
}

#[tokio::test]
async fn queue_stays_bounded_under_pressure() {
    let control_plane = MockServer::start().await;
    let indexer = MockServer::start().await;
    let source_port = portpicker::pick_unused_port().expect("free port");
    let sink = UdpSocket::bind("127.0.0.1:0").await.expect("sink");
    let dest_port = sink.local_addr().expect("addr").port();

    // A slow indexer stalls the batcher so the queue fills.
    Mock::given(method("POST"))
        .and(path("/v1/normalize"))
        .respond_with(
            ResponseTemplate::new(503).set_delay(Duration::from_millis(250)),
        )
        .mount(&indexer)
        .await;

    let mut spec = raw_spec(source_port, dest_port);
    spec.max_queue_size = 50;
    spec.batch_max_events = 10;
    spec.batch_max_seconds = 0.05;
    spec.processor = ProcessorSpec::Indexed {
        indexer_url: indexer.uri(),
        profile: "json_auto".into(),
        timeout_seconds: 1.0,
        fallback_to_raw: false,
    };
    mount_view(&control_plane, "rev-1", vec![assigned("p1", 1, spec)]).await;
    let (registry, cancel) = start_agent(&control_plane.uri()).await;
    wait_for("pipeline running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");
    let target = format!("127.0.0.1:{source_port}");
    let total = 500u64;
    for i in 0..total {
        let _ = sender
            .send_to(format!("burst-{i}").as_bytes(), &target)
            .await
            .expect("send");
        if i % 50 == 0 {
            // The queue bound must hold at every instant.
            let snap = registry.snapshot("p1").expect("snapshot");
            assert!(snap.buffer <= 50, "buffer grew to {}", snap.buffer);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    wait_for("burst absorbed", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.recv + s.dropped_queue_full >= total * 9 / 10)
    })
    .await;
    let snap = registry.snapshot("p1").expect("snapshot");
    assert!(snap.buffer <= 50);
    assert!(snap.dropped_queue_full > 0, "expected queue-full drops");
    assert!(snap.recv + snap.dropped_queue_full <= total);

    cancel.cancel();
}

#[tokio::test]
async fn failed_bind_is_reported_and_not_retried_at_same_version() {
    let control_plane = MockServer::start().await;
    let port = portpicker::pick_unused_port().expect("free port");
    let holder = UdpSocket::bind(("127.0.0.1", port)).await.expect("hold");

    mount_view(
        &control_plane,
        "rev-1",
        vec![assigned("p1", 1, raw_spec(port, 19999))],
    )
    .await;
    let (registry, cancel) = start_agent(&control_plane.uri()).await;
    wait_for("pipeline failed", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Failed)
    })
    .await;
    let snap = registry.snapshot("p1").expect("snapshot");
    assert!(snap.last_err.is_some());

    // A version bump retries the start; with the port free it succeeds.
    drop(holder);
    mount_view(
        &control_plane,
        "rev-2",
        vec![assigned("p1", 2, raw_spec(port, 19999))],
    )
    .await;
    wait_for("pipeline recovered", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    cancel.cancel();
}

#[tokio::test]
async fn shutdown_stops_pipelines_and_releases_ports() {
    let control_plane = MockServer::start().await;
    let source_port = portpicker::pick_unused_port().expect("free port");
    let dest_port = portpicker::pick_unused_port().expect("free port");

    mount_view(
        &control_plane,
        "rev-1",
        vec![assigned("p1", 1, raw_spec(source_port, dest_port))],
    )
    .await;

    let config = AgentConfig {
        agent_id: "agent-a".into(),
        region: "eu-west-1".into(),
        control_plane: ControlPlaneRef {
            url: control_plane.uri(),
        },
        poll_interval_seconds: 0,
        shutdown_deadline_seconds: 5,
        status_addr: None,
    };
    let agent = Agent::new(config).expect("agent");
    let registry = agent.stats_registry();
    let cancel = agent.cancel_token();
    let run = tokio::spawn(agent.run());

    wait_for("pipeline running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    cancel.cancel();
    timeout(Duration::from_secs(6), run)
        .await
        .expect("agent run deadline")
        .expect("join")
        .expect("clean shutdown");

    let rebound = UdpSocket::bind(("127.0.0.1", source_port)).await;
    assert!(rebound.is_ok(), "source port still held after shutdown");
}

#[tokio::test]
async fn status_endpoint_serves_snapshots() {
    let control_plane = MockServer::start().await;
    let source_port = portpicker::pick_unused_port().expect("free port");
    let dest_port = portpicker::pick_unused_port().expect("free port");
    let status_port = portpicker::pick_unused_port().expect("free port");

    mount_view(
        &control_plane,
        "rev-1",
        vec![assigned("p1", 1, raw_spec(source_port, dest_port))],
    )
    .await;

    let config = AgentConfig {
        agent_id: "agent-a".into(),
        region: "eu-west-1".into(),
        control_plane: ControlPlaneRef {
            url: control_plane.uri(),
        },
        poll_interval_seconds: 0,
        shutdown_deadline_seconds: 5,
        status_addr: Some(format!("127.0.0.1:{status_port}")),
    };
    let agent = Agent::new(config).expect("agent");
    let registry = agent.stats_registry();
    let cancel = agent.cancel_token();
    drop(tokio::spawn(agent.run()));

    wait_for("pipeline running", || {
        registry
            .snapshot("p1")
            .is_some_and(|s| s.state == PipelineState::Running)
    })
    .await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{status_port}");
    let mut healthy = false;
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base}/healthz")).send().await {
            if resp.status().is_success() {
                healthy = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(healthy, "status server never came up");

    let body: serde_json::Value = client
        .get(format!("{base}/status"))
        .send()
        .await
        .expect("status")
        .json()
        .await
        .expect("body");
    assert_eq!(body["pipelines"]["p1"]["state"], "running");

    cancel.cancel();
}
