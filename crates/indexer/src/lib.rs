// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! HTTP service normalizing raw log lines into structured documents.
//!
//! The service is stateless: each `POST /v1/normalize` request names a
//! profile and carries the lines to normalize, and every document in the
//! response preserves the original line under `raw`.

pub mod config;
pub mod error;
pub mod profiles;

mod health;
mod normalize;

use crate::config::IndexerConfig;
use crate::error::Error;
use crate::profiles::ProfileRegistry;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

/// Shared state for the indexer HTTP server.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The registered normalization profiles.
    pub(crate) profiles: Arc<ProfileRegistry>,
}

/// Builds the profile registry for `config`: built-ins plus any
/// file-defined profiles under `profiles_dir`.
pub fn build_registry(config: &IndexerConfig) -> Result<ProfileRegistry, Error> {
    let mut registry = ProfileRegistry::with_builtins();
    if let Some(dir) = &config.profiles_dir {
        registry.load_dir(dir)?;
    }
    Ok(registry)
}

/// Runs the indexer HTTP server until shutdown is requested.
pub async fn run(config: IndexerConfig, cancel: CancellationToken) -> Result<(), Error> {
    let registry = build_registry(&config)?;
    info!(profiles = ?registry.names(), "indexer profiles registered");

    let app_state = AppState {
        profiles: Arc::new(registry),
    };

    let app = Router::new()
        .merge(health::routes())
        .merge(normalize::routes())
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(config.max_request_bytes)))
        .with_state(app_state);

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

    info!(endpoint = %addr, "indexer HTTP server listening");

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
