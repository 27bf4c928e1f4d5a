// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Local status endpoints.
//!
//! - GET `/status` - per-pipeline statistics snapshot
//! - GET `/healthz` - liveness probe

use crate::error::Error;
use crate::stats::{PipelineStatsSnapshot, StatsRegistry};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Serialize)]
struct StatusResponse {
    generated_at: String,
    pipelines: HashMap<String, PipelineStatsSnapshot>,
}

async fn show_status(State(registry): State<StatsRegistry>) -> Json<StatusResponse> {
    Json(StatusResponse {
        generated_at: Utc::now().to_rfc3339(),
        pipelines: registry.snapshot_all(),
    })
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Runs the status HTTP server until shutdown is requested.
pub(crate) async fn run(
    bind_address: String,
    registry: StatsRegistry,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let app = Router::new()
        .route("/status", get(show_status))
        .route("/healthz", get(healthz))
        .with_state(registry);

    let addr = bind_address
        .parse::<SocketAddr>()
        .map_err(|e| Error::InvalidBindAddress {
            bind_address: bind_address.clone(),
            details: e.to_string(),
        })?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::BindFailed {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;

    info!(endpoint = %addr, "agent status server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await
        .map_err(|e| Error::ServerError {
            addr: addr.to_string(),
            details: e.to_string(),
        })
}
