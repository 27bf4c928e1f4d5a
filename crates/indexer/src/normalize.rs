// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! The normalize endpoint.
//!
//! - POST `/v1/normalize` - turn a batch of raw lines into documents

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use observix_model::api::{ErrorBody, ErrorCode, NormalizeRequest, NormalizeResponse};

/// Routes for the normalize endpoint.
pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/v1/normalize", post(normalize))
}

async fn normalize(
    State(state): State<AppState>,
    Json(request): Json<NormalizeRequest>,
) -> Result<Json<NormalizeResponse>, (StatusCode, Json<ErrorBody>)> {
    let Some(profile) = state.profiles.get(&request.profile) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(
                ErrorCode::UnknownProfile,
                format!("no profile named '{}'", request.profile),
            )),
        ));
    };

    let docs = request
        .raw
        .into_lines()
        .iter()
        .map(|line| profile.normalize_line(line))
        .collect();
    Ok(Json(NormalizeResponse { docs }))
}
