// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline catalog endpoints.
//!
//! - POST `/v1/pipelines` - create
//! - GET `/v1/pipelines` - list
//! - GET `/v1/pipelines/{id}` - fetch one
//! - PUT `/v1/pipelines/{id}` - partial update, bumping the version on change
//! - DELETE `/v1/pipelines/{id}` - delete, cascading assignments

use crate::AppState;
use crate::http::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use observix_model::api::{
    CreatePipelineRequest, CreatePipelineResponse, UpdatePipelineRequest, UpdatePipelineResponse,
};
use observix_model::catalog::Pipeline;
use tracing::info;

/// Routes for the pipeline endpoints.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/pipelines", post(create_pipeline))
        .route("/v1/pipelines", get(list_pipelines))
        .route("/v1/pipelines/{id}", get(get_pipeline))
        .route("/v1/pipelines/{id}", put(update_pipeline))
        .route("/v1/pipelines/{id}", delete(delete_pipeline))
}

async fn create_pipeline(
    State(state): State<AppState>,
    payload: Result<Json<CreatePipelineRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePipelineResponse>), ApiError> {
    let Json(request) = payload?;
    let pipeline = state.store.create_pipeline(request).await?;
    info!(pipeline_id = %pipeline.pipeline_id, name = %pipeline.name, "pipeline created");
    Ok((
        StatusCode::CREATED,
        Json(CreatePipelineResponse {
            pipeline_id: pipeline.pipeline_id,
            version: pipeline.version,
        }),
    ))
}

async fn list_pipelines(
    State(state): State<AppState>,
) -> Result<Json<Vec<Pipeline>>, ApiError> {
    Ok(Json(state.store.list_pipelines().await?))
}

async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Pipeline>, ApiError> {
    Ok(Json(state.store.get_pipeline(&id).await?))
}

async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePipelineRequest>, JsonRejection>,
) -> Result<Json<UpdatePipelineResponse>, ApiError> {
    let Json(request) = payload?;
    let version = state.store.update_pipeline(&id, request).await?;
    info!(pipeline_id = %id, version, "pipeline updated");
    Ok(Json(UpdatePipelineResponse { version }))
}

async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_pipeline(&id).await?;
    info!(pipeline_id = %id, "pipeline deleted");
    Ok(StatusCode::NO_CONTENT)
}
