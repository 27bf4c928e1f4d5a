// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Agent endpoints.
//!
//! - GET `/v1/agents` - list agents with computed liveness
//! - GET `/v1/agents/{agent_id}/assignments?region=R` - the agent poll
//!   endpoint, honoring `If-None-Match` with the last-applied revision

use crate::AppState;
use crate::http::ApiError;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use observix_model::catalog::AgentRecord;
use serde::Deserialize;

/// Routes for the agent endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/agents", get(list_agents))
        .route("/v1/agents/{agent_id}/assignments", get(poll_assignments))
}

async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<AgentRecord>>, ApiError> {
    let agents = state
        .store
        .list_agents(state.offline_threshold, Utc::now())
        .await?;
    Ok(Json(agents))
}

#[derive(Debug, Deserialize)]
struct PollQuery {
    region: String,
}

async fn poll_assignments(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<PollQuery>,
    headers: header::HeaderMap,
) -> Result<Response, ApiError> {
    let view = state
        .store
        .poll_assignments(&agent_id, &query.region, Utc::now())
        .await?;

    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_matches('"'))
        .is_some_and(|v| v == view.revision);
    if unchanged {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok((
        StatusCode::OK,
        [(header::ETAG, view.revision.clone())],
        Json(view),
    )
        .into_response())
}
