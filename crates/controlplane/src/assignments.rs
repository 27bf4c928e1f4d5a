// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Assignment endpoints.
//!
//! - POST `/v1/assignments` - bind a pipeline to (agent, region)
//! - DELETE `/v1/assignments/{assignment_id}` - remove a binding

use crate::AppState;
use crate::http::ApiError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use observix_model::api::CreateAssignmentRequest;
use observix_model::catalog::Assignment;
use tracing::info;

/// Routes for the assignment endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/assignments", post(create_assignment))
        .route("/v1/assignments", get(list_assignments))
        .route("/v1/assignments/{id}", delete(delete_assignment))
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    let assignment = state.store.create_assignment(request).await?;
    info!(
        assignment_id = %assignment.assignment_id,
        agent_id = %assignment.agent_id,
        region = %assignment.region,
        pipeline_id = %assignment.pipeline_id,
        "assignment created"
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn list_assignments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    Ok(Json(state.store.list_assignments().await?))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_assignment(&id).await?;
    info!(assignment_id = %id, "assignment deleted");
    Ok(StatusCode::NO_CONTENT)
}
