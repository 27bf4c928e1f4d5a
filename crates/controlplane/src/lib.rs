// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Observix control plane.
//!
//! The authoritative catalog for pipelines, assignments, and agent
//! registrations, served over HTTP. Agents poll
//! `/v1/agents/{id}/assignments` and converge on the returned view; the
//! CLI drives the catalog endpoints.

pub mod config;
pub mod error;
pub mod revision;
pub mod store;

mod agents;
mod assignments;
mod health;
mod http;
mod pipelines;

use crate::config::ControlPlaneConfig;
use crate::error::Error;
use crate::store::Store;
use axum::Router;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// Shared state for the control-plane HTTP server.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The catalog store.
    pub(crate) store: Store,
    /// Agents silent for longer than this are reported offline.
    pub(crate) offline_threshold: Duration,
}

/// Builds the control-plane router over an already-opened store.
#[must_use]
pub fn router(store: Store, offline_threshold: Duration) -> Router {
    let state = AppState {
        store,
        offline_threshold,
    };
    Router::new()
        .merge(health::routes())
        .merge(pipelines::routes())
        .merge(assignments::routes())
        .merge(agents::routes())
        .with_state(state)
}

fn cors_layer(allow_origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if allow_origins.is_empty() {
        return Ok(None);
    }
    let origins = allow_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| Error::InvalidOrigin {
                origin: origin.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    ))
}

/// Runs the control-plane HTTP server until shutdown is requested.
pub async fn run(config: ControlPlaneConfig, cancel: CancellationToken) -> Result<(), Error> {
    let store = Store::connect(&config.database_url)
        .await
        .map_err(|e| Error::StoreInit {
            database_url: config.database_url.clone(),
            details: e.to_string(),
        })?;

    let offline_threshold = Duration::from_secs(config.agent_offline_threshold_seconds);
    let mut app = router(store, offline_threshold);
    if let Some(cors) = cors_layer(&config.allow_origins)? {
        app = app.layer(cors);
    }

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| Error::InvalidBindAddress {
            bind_address: config.bind_address(),
            details: e.to_string(),
        })?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::BindFailed {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;

    info!(endpoint = %addr, "control-plane HTTP server listening");

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
