// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Liveness endpoint.
//!
//! - GET `/healthz` - 200 while the store is reachable

use crate::AppState;
use crate::http::ApiError;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

/// Routes for the health endpoint.
pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.healthcheck().await?;
    Ok(StatusCode::OK)
}
