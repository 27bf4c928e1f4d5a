// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Liveness endpoint.
//!
//! - GET `/healthz` - 200 while the service is up

use crate::AppState;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

/// Routes for the health endpoint.
pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
